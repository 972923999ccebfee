use chrono::{Duration, TimeZone, Utc};
use common::{CinemaId, MovieId, ScreeningId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    BookingService, HoldSeats, InMemoryCatalog, InMemoryLoyaltyService, Money, RowOccupancy,
    ScreeningInfo, SeatSpec, SeatType, Slot, validate_selection,
};
use event_store::InMemoryEventStore;

fn catalog_with_screening() -> (InMemoryCatalog, ScreeningId) {
    let catalog = InMemoryCatalog::new();
    let screening_id = ScreeningId::new();
    let starts_at = Utc.with_ymd_and_hms(2024, 3, 4, 19, 0, 0).unwrap();
    catalog.add_screening(ScreeningInfo {
        screening_id,
        cinema_id: CinemaId::new(),
        movie_id: MovieId::new(),
        room_name: "Room 1".to_string(),
        starts_at,
        ends_at: starts_at + Duration::hours(2),
        movie_archived: false,
        seats: (0..10u8)
            .flat_map(|row| {
                let row_label = ((b'A' + row) as char).to_string();
                (1..=16u32).map(move |n| {
                    SeatSpec::new(
                        format!("{row_label}{n}"),
                        row_label.clone(),
                        n,
                        SeatType::Standard,
                    )
                })
            })
            .collect(),
    });
    catalog.set_base_price(SeatType::Standard, Money::from_minor(90_000));
    (catalog, screening_id)
}

fn bench_hold_seats(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/hold_seats", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (catalog, screening_id) = catalog_with_screening();
                let service = BookingService::new(
                    InMemoryEventStore::new(),
                    catalog,
                    InMemoryLoyaltyService::new(),
                    Duration::minutes(10),
                );
                let cmd = HoldSeats::new(
                    screening_id,
                    vec!["E7".into(), "E8".into(), "E9".into()],
                    None,
                );
                service.hold_seats(cmd, Utc::now()).await.unwrap();
            });
        });
    });
}

fn bench_orphan_validation(c: &mut Criterion) {
    // A sparse row where every second block is occupied.
    let mut slots = vec![Slot::Available; 32];
    for i in (0..32).step_by(5) {
        slots[i] = Slot::Occupied;
    }
    slots[16] = Slot::Selected;
    slots[17] = Slot::Selected;
    let rows = vec![RowOccupancy::new("E", slots)];

    c.bench_function("domain/orphan_validation", |b| {
        b.iter(|| {
            let _ = validate_selection(&rows);
        });
    });
}

criterion_group!(benches, bench_hold_seats, bench_orphan_validation);
criterion_main!(benches);
