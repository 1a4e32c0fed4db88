// Criterion benchmarks for vendor scoring

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use uuid::Uuid;
use vendor_match::core::{calculate_score, service_overlap, Matcher};
use vendor_match::models::{ClientRef, MatchCriteria, Project, ProjectStatus, Vendor};

const COUNTRIES: [&str; 5] = ["UAE", "KSA", "US", "DE", "SG"];
const SERVICES: [&str; 6] = ["legal", "payroll", "marketing", "tax", "hiring", "logistics"];

fn create_vendor(id: usize) -> Vendor {
    Vendor {
        id: id as i32,
        name: format!("Vendor {}", id),
        countries_supported: vec![
            COUNTRIES[id % COUNTRIES.len()].to_string(),
            COUNTRIES[(id + 2) % COUNTRIES.len()].to_string(),
        ],
        services_offered: SERVICES
            .iter()
            .enumerate()
            .filter(|(i, _)| (id + i) % 3 != 0)
            .map(|(_, s)| s.to_string())
            .collect(),
        rating: if id % 7 == 0 {
            None
        } else {
            Some(Decimal::new((id % 50) as i64, 1))
        },
        response_sla_hours: [12, 24, 48, 72, 96][id % 5],
        sla_expires_at: None,
        sla_expired: false,
    }
}

fn create_project() -> Project {
    Project {
        id: Uuid::new_v4(),
        client: ClientRef {
            id: 1,
            company_name: "Acme".to_string(),
            contact_email: "ops@acme.test".to_string(),
        },
        country: "UAE".to_string(),
        services_needed: vec!["legal".to_string(), "payroll".to_string(), "tax".to_string()],
        budget: Decimal::new(2_500_000, 2),
        status: ProjectStatus::Active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bench_calculate_score(c: &mut Criterion) {
    let vendor = create_vendor(11);
    let overlap = service_overlap(&create_project(), &vendor);
    let criteria = MatchCriteria::default();

    c.bench_function("calculate_score", |b| {
        b.iter(|| calculate_score(black_box(&overlap), black_box(&vendor), black_box(&criteria)));
    });
}

fn bench_score_vendors(c: &mut Criterion) {
    let matcher = Matcher::with_default_criteria();
    let project = create_project();

    let mut group = c.benchmark_group("score_vendors");

    for vendor_count in [10, 100, 1000, 10_000].iter() {
        let vendors: Vec<Vendor> = (0..*vendor_count).map(create_vendor).collect();

        group.bench_with_input(
            BenchmarkId::new("score_vendors", vendor_count),
            vendor_count,
            |b, _| {
                b.iter(|| matcher.score_vendors(black_box(&project), black_box(&vendors)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_calculate_score, bench_score_vendors);

criterion_main!(benches);
