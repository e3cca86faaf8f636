use std::sync::Arc;

use context_store::InMemoryContextStore;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Cart, CartItem, Money, PaymentSelection};
use placeorder::services::fake_gateway::METHOD_COMPLETED;
use placeorder::{
    FAKE_GATEWAY_CODE, FakePaymentGateway, InMemoryCartService, InMemoryOrderService,
    PaymentService, PlaceOrderCoordinator, PlaceOrderServices, ProcessFactory, StartPlaceOrder,
    default_registry,
};

const RETURN_ADDRESS: &str = "https://shop.example.com/checkout/return";

fn coordinator() -> PlaceOrderCoordinator<InMemoryContextStore> {
    let gateway = FakePaymentGateway::new();
    let payments = PaymentService::new().with_gateway(FAKE_GATEWAY_CODE, Arc::new(gateway));
    let services = PlaceOrderServices::new(
        Arc::new(payments),
        Arc::new(InMemoryOrderService::new()),
        Arc::new(InMemoryCartService::new()),
    );
    let registry = Arc::new(default_registry(&services).unwrap());
    PlaceOrderCoordinator::new(InMemoryContextStore::new(), ProcessFactory::new(registry))
}

fn paid_cart() -> Cart {
    Cart::new("cart-bench")
        .with_item(CartItem::new("SKU-BENCH", "Benchmark Widget", 2, Money::from_cents(1000)))
        .with_payment_selection(PaymentSelection::new(FAKE_GATEWAY_CODE, METHOD_COMPLETED))
}

fn bench_paid_order_to_success(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = coordinator();
    let mut session = 0u64;

    c.bench_function("placeorder/paid_start_to_success", |b| {
        b.iter(|| {
            session += 1;
            let key = format!("session-{session}");
            rt.block_on(async {
                coordinator
                    .start(&key, StartPlaceOrder::new(paid_cart(), RETURN_ADDRESS))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_zero_total_to_success(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = coordinator();
    let cart = Cart::new("cart-free").with_item(CartItem::new(
        "GIFT-1",
        "Voucher",
        1,
        Money::zero(),
    ));

    c.bench_function("placeorder/zero_total_start_to_success", |b| {
        b.iter(|| {
            rt.block_on(async {
                coordinator
                    .start("session", StartPlaceOrder::new(cart.clone(), RETURN_ADDRESS))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_refresh_suspended(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = coordinator();
    let cart = paid_cart().with_payment_selection(PaymentSelection::new(
        FAKE_GATEWAY_CODE,
        "payment_waiting_for_customer",
    ));
    rt.block_on(async {
        coordinator
            .start("session", StartPlaceOrder::new(cart, RETURN_ADDRESS))
            .await
            .unwrap();
    });

    c.bench_function("placeorder/refresh_waiting_for_customer", |b| {
        b.iter(|| {
            rt.block_on(async {
                coordinator.refresh("session").await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_paid_order_to_success,
    bench_zero_total_to_success,
    bench_refresh_suspended
);
criterion_main!(benches);
