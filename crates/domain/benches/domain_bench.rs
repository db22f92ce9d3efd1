use std::sync::Arc;

use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Aggregate, CloseTab, EventSourcedRepository, MarkDrinksServed, MarkFoodServed, Money,
    NoopPublisher, OpenTab, OrderItem, PlaceOrder, Repository, Runbook, RunbookEvent, Tab,
    TabCommand, TabService,
};
use event_store::{AppendOptions, EventStore, InMemoryEventStore, PendingEvent};

fn order() -> Vec<OrderItem> {
    vec![
        OrderItem::drink(1, "beer", Money::from_cents(300)),
        OrderItem::food(3, "pizza", Money::from_cents(800)),
        OrderItem::drink(2, "juice", Money::from_cents(100)),
    ]
}

fn bench_open_tab(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let service = TabService::with_store(store, Arc::new(NoopPublisher));

    c.bench_function("domain/open_tab", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.open_tab(OpenTab::new(3, "John")).await.unwrap();
            });
        });
    });
}

fn bench_full_tab_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/full_open_order_serve_close", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service =
                    TabService::with_store(InMemoryEventStore::new(), Arc::new(NoopPublisher));
                let cmd = OpenTab::new(3, "John");
                let tab_id = cmd.tab_id;
                service.open_tab(cmd).await.unwrap();
                service
                    .place_order(PlaceOrder::new(tab_id, order()))
                    .await
                    .unwrap();
                service
                    .mark_drinks_served(MarkDrinksServed::new(tab_id, vec![1, 2]))
                    .await
                    .unwrap();
                service
                    .mark_food_served(MarkFoodServed::new(tab_id, vec![3]))
                    .await
                    .unwrap();
                service
                    .close_tab(CloseTab::new(tab_id, Money::from_cents(1200)))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_decide_place_order(c: &mut Criterion) {
    let mut tab = Tab::default();
    let tab_id = AggregateId::new();
    tab.handle(&OpenTab::with_id(tab_id, 3, "John").into(), &NoopPublisher)
        .unwrap();
    let cmd: TabCommand = PlaceOrder::new(tab_id, order()).into();

    c.bench_function("domain/decide_place_order", |b| {
        b.iter(|| tab.decide(&cmd).unwrap());
    });
}

fn bench_runbook_replay_50_tasks(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let runbook_id = AggregateId::new();

    // 1 create + 50 task-added events
    rt.block_on(async {
        let mut events = vec![RunbookEvent::runbook_created(runbook_id, "Bench", "alice")];
        for n in 0..50 {
            events.push(RunbookEvent::task_added(
                runbook_id,
                format!("task-{n}"),
                format!("Step {n}"),
                "",
            ));
        }
        let pending = events
            .iter()
            .map(|e| PendingEvent::from_event("Runbook", domain::DomainEvent::event_type(e), e))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        store
            .append(runbook_id, pending, AppendOptions::new())
            .await
            .unwrap();
    });

    let repository = EventSourcedRepository::<_, Runbook>::new(store);

    c.bench_function("domain/replay_runbook_51_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let runbook = repository.find(runbook_id).await.unwrap();
                assert_eq!(runbook.tasks().len(), 50);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_open_tab,
    bench_full_tab_cycle,
    bench_decide_place_order,
    bench_runbook_replay_50_tasks,
);
criterion_main!(benches);
