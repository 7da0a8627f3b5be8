//! Cart reconciliation.
//!
//! Mutations are applied to the client-visible cart and answered
//! immediately; persisting the snapshot onto the user record happens on the
//! `CartSync` queue. The queue is eventually consistent: a flush failure is
//! logged and the visible cart stays ahead of the stored one until the next
//! successful flush.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};

use crate::domain::aggregates::{Cart, Product, User};
use crate::domain::value_objects::{Money, ProductId, UserId};
use crate::error::{Result, ServiceError};
use crate::store::Repository;

/// Snapshot flush queue. A single worker writes snapshots one at a time, so
/// at most one flush per user is ever in flight, and only the newest snapshot
/// per user is kept while waiting.
#[derive(Clone)]
pub struct CartSync {
    shared: Arc<SyncShared>,
    queue: mpsc::UnboundedSender<UserId>,
}

struct SyncShared {
    pending: Mutex<PendingCarts>,
    outstanding: watch::Sender<usize>,
}

#[derive(Default)]
struct PendingCarts {
    carts: HashMap<UserId, PendingCart>,
    seq: u64,
}

struct PendingCart {
    cart: Cart,
    version: u64,
    queued: bool,
}

impl CartSync {
    /// Starts the flush worker on the current runtime.
    pub fn spawn(repo: Repository) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let (outstanding, _) = watch::channel(0);
        let shared = Arc::new(SyncShared { pending: Mutex::new(PendingCarts::default()), outstanding });
        tokio::spawn(flush_worker(repo, Arc::clone(&shared), rx));
        Self { shared, queue }
    }

    /// Replaces the user's pending snapshot and schedules a flush if none is queued.
    pub async fn enqueue(&self, user_id: UserId, cart: Cart) {
        let mut pending = self.shared.pending.lock().await;
        pending.seq += 1;
        let version = pending.seq;
        let needs_queue = match pending.carts.get_mut(&user_id) {
            Some(slot) => {
                slot.cart = cart;
                slot.version = version;
                !std::mem::replace(&mut slot.queued, true)
            }
            None => {
                pending.carts.insert(user_id, PendingCart { cart, version, queued: true });
                true
            }
        };
        if needs_queue {
            self.shared.outstanding.send_modify(|n| *n += 1);
            if self.queue.send(user_id).is_err() {
                tracing::error!(user_id = %user_id, "Cart flush worker stopped, snapshot kept in memory only");
                self.shared.outstanding.send_modify(|n| *n = n.saturating_sub(1));
            }
        }
    }

    /// Newest snapshot not yet confirmed as stored.
    pub async fn pending(&self, user_id: &UserId) -> Option<Cart> {
        self.shared.pending.lock().await.carts.get(user_id).map(|p| p.cart.clone())
    }

    /// Drops any unflushed snapshot for the user.
    pub async fn discard(&self, user_id: &UserId) {
        self.shared.pending.lock().await.carts.remove(user_id);
    }

    /// Resolves once every queued snapshot has been attempted.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.outstanding.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

async fn flush_worker(repo: Repository, shared: Arc<SyncShared>, mut rx: mpsc::UnboundedReceiver<UserId>) {
    while let Some(user_id) = rx.recv().await {
        let job = {
            let mut pending = shared.pending.lock().await;
            pending.carts.get_mut(&user_id).map(|slot| {
                slot.queued = false;
                (slot.cart.clone(), slot.version)
            })
        };

        if let Some((cart, version)) = job {
            let stored = repo.update::<User, _, _>(&user_id, move |user| user.replace_cart(cart)).await;
            let settled = match stored {
                Ok(Some(_)) => {
                    tracing::debug!(user_id = %user_id, version, "Cart snapshot flushed");
                    true
                }
                Ok(None) => {
                    tracing::warn!(user_id = %user_id, "Cart flush skipped, user no longer exists");
                    true
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Cart flush failed");
                    false
                }
            };
            if settled {
                let mut pending = shared.pending.lock().await;
                if pending.carts.get(&user_id).is_some_and(|slot| slot.version == version) {
                    pending.carts.remove(&user_id);
                }
            }
        }

        shared.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub cart_items: Cart,
    pub total_count: u64,
    pub total_amount: Money,
}

#[derive(Clone)]
pub struct CartService {
    repo: Repository,
    sync: CartSync,
}

impl CartService {
    pub fn new(repo: Repository, sync: CartSync) -> Self { Self { repo, sync } }

    /// The client-visible cart: the pending snapshot, else the stored one.
    pub async fn current(&self, user_id: &UserId) -> Result<Cart> {
        if let Some(cart) = self.sync.pending(user_id).await {
            return Ok(cart);
        }
        let user: User = self.repo.find(user_id).await?.ok_or_else(|| ServiceError::not_found("User"))?;
        Ok(user.cart().clone())
    }

    pub async fn summary(&self, user_id: &UserId) -> Result<CartSummary> {
        let cart = self.current(user_id).await?;
        let prices: HashMap<ProductId, Money> =
            self.repo.all::<Product>().await?.iter().map(|p| (p.id(), p.offer_price())).collect();
        Ok(CartSummary {
            total_count: cart.total_count(),
            total_amount: cart.total_amount(|id| prices.get(id).copied()),
            cart_items: cart,
        })
    }

    pub async fn add_item(&self, user_id: UserId, product_id: ProductId) -> Result<Cart> {
        self.ensure_product(&product_id).await?;
        self.mutate(user_id, |cart| cart.add_item(product_id)).await
    }

    pub async fn set_quantity(&self, user_id: UserId, product_id: ProductId, quantity: i64) -> Result<Cart> {
        if quantity > 0 {
            self.ensure_product(&product_id).await?;
        }
        self.mutate(user_id, |cart| cart.set_quantity(product_id, quantity)).await
    }

    pub async fn remove_one(&self, user_id: UserId, product_id: ProductId) -> Result<Cart> {
        self.mutate(user_id, |cart| cart.remove_one(&product_id)).await
    }

    /// Full-snapshot sync from the client; last writer wins.
    pub async fn replace(&self, user_id: UserId, snapshot: HashMap<String, i64>) -> Result<Cart> {
        let entries = snapshot
            .into_iter()
            .map(|(id, qty)| Ok((id.parse::<ProductId>()?, qty)))
            .collect::<Result<Vec<_>>>()?;
        let cart = Cart::from_snapshot(entries);
        self.current(&user_id).await?;
        self.sync.enqueue(user_id, cart.clone()).await;
        Ok(cart)
    }

    async fn mutate(&self, user_id: UserId, f: impl FnOnce(&mut Cart)) -> Result<Cart> {
        let mut cart = self.current(&user_id).await?;
        f(&mut cart);
        self.sync.enqueue(user_id, cart.clone()).await;
        Ok(cart)
    }

    async fn ensure_product(&self, product_id: &ProductId) -> Result<()> {
        match self.repo.find::<Product>(product_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("Product")),
        }
    }
}
