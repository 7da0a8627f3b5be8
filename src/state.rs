//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::config::AppConfig;
use crate::payments::PaymentGateway;
use crate::publisher::EventPublisher;
use crate::services::{
    AddressService, AdminService, CartService, CartSync, CatalogService, OrderService, PaymentReconciler, RatingService, SagaLog,
};
use crate::store::Repository;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    tokens: TokenKeys,
    cart_sync: CartSync,
    carts: CartService,
    orders: OrderService,
    reconciler: PaymentReconciler,
    ratings: RatingService,
    addresses: AddressService,
    catalog: CatalogService,
    admin: AdminService,
    saga: SagaLog,
}

impl AppState {
    /// Wires the services over one repository. Spawns the cart flush worker,
    /// so it must be called inside a Tokio runtime.
    pub fn new(config: AppConfig, repo: Repository, gateway: Arc<dyn PaymentGateway>, events: EventPublisher) -> Self {
        let cart_sync = CartSync::spawn(repo.clone());
        let saga = SagaLog::new(repo.clone(), cart_sync.clone());
        Self {
            inner: Arc::new(AppStateInner {
                tokens: TokenKeys::new(&config.auth),
                carts: CartService::new(repo.clone(), cart_sync.clone()),
                orders: OrderService::new(repo.clone(), Arc::clone(&gateway), events.clone(), saga.clone()),
                reconciler: PaymentReconciler::new(repo.clone(), gateway, cart_sync.clone(), events.clone(), saga.clone()),
                ratings: RatingService::new(repo.clone(), events),
                addresses: AddressService::new(repo.clone()),
                catalog: CatalogService::new(repo.clone()),
                admin: AdminService::new(repo),
                config,
                cart_sync,
                saga,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig { &self.inner.config }
    pub fn tokens(&self) -> &TokenKeys { &self.inner.tokens }
    pub fn cart_sync(&self) -> &CartSync { &self.inner.cart_sync }
    pub fn carts(&self) -> &CartService { &self.inner.carts }
    pub fn orders(&self) -> &OrderService { &self.inner.orders }
    pub fn reconciler(&self) -> &PaymentReconciler { &self.inner.reconciler }
    pub fn ratings(&self) -> &RatingService { &self.inner.ratings }
    pub fn addresses(&self) -> &AddressService { &self.inner.addresses }
    pub fn catalog(&self) -> &CatalogService { &self.inner.catalog }
    pub fn admin(&self) -> &AdminService { &self.inner.admin }
    pub fn saga(&self) -> &SagaLog { &self.inner.saga }
}
