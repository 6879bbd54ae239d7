//! The cart store: mutation API over a server-authoritative cart.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::cart::CartError;
use crate::commerce::CommerceError;
use crate::commerce::types::{Cart, CartLine, CartLineInput, CartLineUpdateInput, Money};

// =============================================================================
// Seams
// =============================================================================

/// Remote cart operations the store depends on.
///
/// Implemented by [`crate::commerce::CommerceClient`]; tests substitute an
/// in-memory fake.
pub trait CartApi: Send + Sync {
    /// Create a new cart seeded with the given lines.
    fn create_cart(
        &self,
        lines: Vec<CartLineInput>,
    ) -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Fetch a cart by id. `NotFound` when the id is unknown or expired.
    fn get_cart(&self, cart_id: &str) -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Add lines to an existing cart.
    fn add_to_cart(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
    ) -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Update quantities on existing lines.
    fn update_cart_lines(
        &self,
        cart_id: &str,
        lines: Vec<CartLineUpdateInput>,
    ) -> impl Future<Output = Result<Cart, CommerceError>> + Send;

    /// Remove lines from an existing cart.
    fn remove_from_cart(
        &self,
        cart_id: &str,
        line_ids: Vec<String>,
    ) -> impl Future<Output = Result<Cart, CommerceError>> + Send;
}

/// Persistence for the cart id between visits.
///
/// Only the id is ever stored. Cart contents always come from the platform,
/// so a lost or stale id costs at most an empty cart, never wrong totals.
pub trait CartIdStore: Send + Sync {
    /// Read the persisted cart id, if any.
    fn get(&self) -> impl Future<Output = Result<Option<String>, CartError>> + Send;

    /// Persist the cart id.
    fn set(&self, cart_id: &str) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Forget the persisted cart id.
    fn clear(&self) -> impl Future<Output = Result<(), CartError>> + Send;
}

// =============================================================================
// View
// =============================================================================

/// Denormalized read-model of the cart, serialized to the storefront UI.
///
/// Every field is a direct projection of the platform's last full response.
/// Nothing is computed locally: `count` is the platform's `totalQuantity` and
/// `subtotal` is its `totalAmount`, both verbatim.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Lines from the last full response.
    pub items: Vec<CartLine>,
    /// Total item quantity as reported by the platform.
    pub count: i64,
    /// Amount shown as the cart panel subtotal. Absent until a cart exists.
    pub subtotal: Option<Money>,
    /// Checkout hand-off URL. Absent until a cart exists.
    pub checkout_url: Option<String>,
    /// Whether the cart panel should be shown.
    pub panel_open: bool,
    /// Whether a mutation is currently in flight.
    pub busy: bool,
}

#[derive(Debug, Default)]
struct CartState {
    cart: Option<Cart>,
    panel_open: bool,
}

/// RAII guard for the mutation-in-flight count.
///
/// A counter rather than a flag: a mutation queued behind the state lock is
/// still in flight from the caller's perspective.
struct BusyGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl<'a> BusyGuard<'a> {
    fn enter(in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Mutation API over a server-authoritative cart.
///
/// The state lock is held for the whole of each mutation, so overlapping
/// calls on one instance execute one at a time in arrival order. Rapid
/// repeated edits (a quantity stepper clicked quickly) therefore settle on
/// the last request's result instead of racing.
pub struct CartStore<A, S> {
    api: A,
    ids: S,
    state: Mutex<CartState>,
    in_flight: AtomicUsize,
}

impl<A: CartApi, S: CartIdStore> CartStore<A, S> {
    /// Create a store over the given cart API and id persistence.
    pub fn new(api: A, ids: S) -> Self {
        Self {
            api,
            ids,
            state: Mutex::new(CartState::default()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Whether a mutation is currently running or queued.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Current view of the cart.
    pub async fn snapshot(&self) -> CartView {
        let state = self.state.lock().await;
        self.project(&state)
    }

    fn project(&self, state: &CartState) -> CartView {
        let cart = state.cart.as_ref();
        CartView {
            items: cart.map(|c| c.lines.clone()).unwrap_or_default(),
            count: cart.map_or(0, |c| c.total_quantity),
            subtotal: cart.map(|c| c.cost.total_amount.clone()),
            checkout_url: cart.map(|c| c.checkout_url.clone()),
            panel_open: state.panel_open,
            busy: self.is_busy(),
        }
    }

    /// Load the cart referenced by a previously persisted id, if any.
    ///
    /// Failure is silent. A missing cart on load is not a user-facing error:
    /// an id the platform no longer recognizes is cleared so the next add
    /// starts fresh, while a transient failure keeps the id for a later try.
    #[instrument(skip(self))]
    pub async fn load(&self) {
        let cart_id = match self.ids.get().await {
            Ok(Some(id)) => id,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted cart id");
                return;
            }
        };

        match self.api.get_cart(&cart_id).await {
            Ok(cart) => {
                self.state.lock().await.cart = Some(cart);
            }
            Err(CommerceError::NotFound(_)) => {
                tracing::info!(cart_id = %cart_id, "persisted cart id no longer valid, clearing");
                if let Err(e) = self.ids.clear().await {
                    tracing::warn!(error = %e, "failed to clear stale cart id");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load cart");
            }
        }
    }

    /// Add a variant to the cart, creating the cart on first use.
    ///
    /// On success the whole local cart is replaced with the platform's
    /// response and the panel is opened. On failure prior state is untouched.
    #[instrument(skip(self))]
    pub async fn add_line(&self, variant_id: &str, quantity: i64) -> Result<(), CartError> {
        let _busy = BusyGuard::enter(&self.in_flight);
        let mut state = self.state.lock().await;

        let line = CartLineInput {
            merchandise_id: variant_id.to_string(),
            quantity,
        };

        let cart = match self.ids.get().await? {
            Some(cart_id) => self.api.add_to_cart(&cart_id, vec![line]).await?,
            None => {
                let cart = self.api.create_cart(vec![line]).await?;
                self.ids.set(&cart.id).await?;
                cart
            }
        };

        state.cart = Some(cart);
        state.panel_open = true;
        Ok(())
    }

    /// Set a line's quantity.
    ///
    /// Zero or negative quantities collapse to removal: a line that leaves
    /// the cart is deleted, and no update request ever carries a non-positive
    /// quantity.
    #[instrument(skip(self))]
    pub async fn update_line_quantity(
        &self,
        line_id: &str,
        quantity: i64,
    ) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove_line(line_id).await;
        }

        let _busy = BusyGuard::enter(&self.in_flight);
        let mut state = self.state.lock().await;

        let cart_id = self.ids.get().await?.ok_or(CartError::NoActiveCart)?;
        let update = CartLineUpdateInput {
            id: line_id.to_string(),
            quantity,
        };
        let cart = self.api.update_cart_lines(&cart_id, vec![update]).await?;

        state.cart = Some(cart);
        Ok(())
    }

    /// Remove a line from the cart.
    #[instrument(skip(self))]
    pub async fn remove_line(&self, line_id: &str) -> Result<(), CartError> {
        let _busy = BusyGuard::enter(&self.in_flight);
        let mut state = self.state.lock().await;

        let cart_id = self.ids.get().await?.ok_or(CartError::NoActiveCart)?;
        let cart = self
            .api
            .remove_from_cart(&cart_id, vec![line_id.to_string()])
            .await?;

        state.cart = Some(cart);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex as StdMutex};

    use tokio::sync::Notify;

    use super::*;
    use crate::commerce::GraphQLError;
    use crate::commerce::types::{CartCost, CartLineCost, Merchandise, MerchandiseProduct};

    const UNIT_PRICE_CENTS: i64 = 499;

    fn money(cents: i64) -> Money {
        Money {
            amount: format!("{}.{:02}", cents / 100, cents % 100),
            currency_code: "USD".to_string(),
        }
    }

    fn merchandise(variant_id: &str) -> Merchandise {
        Merchandise {
            id: variant_id.to_string(),
            title: "4-pack".to_string(),
            price: money(UNIT_PRICE_CENTS),
            image: None,
            product: MerchandiseProduct {
                id: format!("product-of-{variant_id}"),
                handle: "blackcurrant-spritz".to_string(),
                title: "Blackcurrant Spritz".to_string(),
                featured_image: None,
            },
        }
    }

    /// Server-side cart model. Recomputes totals the way the platform would,
    /// so projection tests compare against independently derived numbers.
    #[derive(Default)]
    struct FakeServer {
        // cart id -> (line id, variant id, quantity)
        carts: HashMap<String, Vec<(String, String, i64)>>,
        next_cart: u64,
        next_line: u64,
    }

    impl FakeServer {
        fn render(&self, cart_id: &str) -> Option<Cart> {
            let lines = self.carts.get(cart_id)?;
            let rendered: Vec<CartLine> = lines
                .iter()
                .map(|(line_id, variant_id, quantity)| CartLine {
                    id: line_id.clone(),
                    quantity: *quantity,
                    cost: CartLineCost {
                        amount_per_quantity: money(UNIT_PRICE_CENTS),
                        total_amount: money(UNIT_PRICE_CENTS * quantity),
                    },
                    merchandise: merchandise(variant_id),
                })
                .collect();

            let total_quantity: i64 = lines.iter().map(|(_, _, q)| q).sum();
            let subtotal_cents = UNIT_PRICE_CENTS * total_quantity;

            Some(Cart {
                id: cart_id.to_string(),
                checkout_url: format!("https://checkout.example.com/{cart_id}"),
                total_quantity,
                cost: CartCost {
                    subtotal_amount: money(subtotal_cents),
                    total_amount: money(subtotal_cents),
                    total_tax_amount: None,
                },
                lines: rendered,
            })
        }
    }

    /// In-memory stand-in for the commerce platform.
    #[derive(Clone, Default)]
    struct FakeCartApi {
        inner: Arc<FakeApiInner>,
    }

    #[derive(Default)]
    struct FakeApiInner {
        server: StdMutex<FakeServer>,
        calls: StdMutex<Vec<&'static str>>,
        fail_next: AtomicBool,
        hold: StdMutex<Option<Arc<Notify>>>,
    }

    impl FakeCartApi {
        fn new() -> Self {
            Self::default()
        }

        fn calls(&self) -> Vec<&'static str> {
            self.inner.calls.lock().unwrap().clone()
        }

        fn fail_next_call(&self) {
            self.inner.fail_next.store(true, Ordering::SeqCst);
        }

        /// Park the next API call on the returned gate until notified.
        fn hold_next_call(&self) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            *self.inner.hold.lock().unwrap() = Some(Arc::clone(&gate));
            gate
        }

        fn forget_cart(&self, cart_id: &str) {
            self.inner.server.lock().unwrap().carts.remove(cart_id);
        }

        /// Create a cart directly on the fake server, bypassing the call log.
        fn seed_cart(&self, lines: &[(&str, i64)]) -> String {
            let mut server = self.inner.server.lock().unwrap();
            server.next_cart += 1;
            let cart_id = format!("cart-{}", server.next_cart);
            let mut stored = Vec::new();
            for (variant_id, quantity) in lines {
                server.next_line += 1;
                stored.push((
                    format!("line-{}", server.next_line),
                    (*variant_id).to_string(),
                    *quantity,
                ));
            }
            server.carts.insert(cart_id.clone(), stored);
            cart_id
        }

        async fn begin(&self, call: &'static str) -> Result<(), CommerceError> {
            let gate = self.inner.hold.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.inner.calls.lock().unwrap().push(call);
            if self.inner.fail_next.swap(false, Ordering::SeqCst) {
                return Err(CommerceError::GraphQL(vec![GraphQLError::message_only(
                    "injected failure",
                )]));
            }
            Ok(())
        }
    }

    impl CartApi for FakeCartApi {
        async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, CommerceError> {
            self.begin("create").await?;
            let mut server = self.inner.server.lock().unwrap();
            server.next_cart += 1;
            let cart_id = format!("cart-{}", server.next_cart);
            let mut stored = Vec::new();
            for line in lines {
                server.next_line += 1;
                stored.push((
                    format!("line-{}", server.next_line),
                    line.merchandise_id,
                    line.quantity,
                ));
            }
            server.carts.insert(cart_id.clone(), stored);
            Ok(server.render(&cart_id).expect("cart just inserted"))
        }

        async fn get_cart(&self, cart_id: &str) -> Result<Cart, CommerceError> {
            self.begin("get").await?;
            let server = self.inner.server.lock().unwrap();
            server
                .render(cart_id)
                .ok_or_else(|| CommerceError::NotFound(format!("Cart not found: {cart_id}")))
        }

        async fn add_to_cart(
            &self,
            cart_id: &str,
            lines: Vec<CartLineInput>,
        ) -> Result<Cart, CommerceError> {
            self.begin("add").await?;
            let mut server = self.inner.server.lock().unwrap();
            if !server.carts.contains_key(cart_id) {
                return Err(CommerceError::NotFound(format!("Cart not found: {cart_id}")));
            }
            let mut appended = Vec::new();
            for line in lines {
                server.next_line += 1;
                appended.push((
                    format!("line-{}", server.next_line),
                    line.merchandise_id,
                    line.quantity,
                ));
            }
            server
                .carts
                .get_mut(cart_id)
                .expect("checked above")
                .extend(appended);
            Ok(server.render(cart_id).expect("cart exists"))
        }

        async fn update_cart_lines(
            &self,
            cart_id: &str,
            lines: Vec<CartLineUpdateInput>,
        ) -> Result<Cart, CommerceError> {
            self.begin("update").await?;
            let mut server = self.inner.server.lock().unwrap();
            let cart = server
                .carts
                .get_mut(cart_id)
                .ok_or_else(|| CommerceError::NotFound(format!("Cart not found: {cart_id}")))?;
            for update in lines {
                if let Some(entry) = cart.iter_mut().find(|(line_id, _, _)| *line_id == update.id)
                {
                    entry.2 = update.quantity;
                }
            }
            Ok(server.render(cart_id).expect("cart exists"))
        }

        async fn remove_from_cart(
            &self,
            cart_id: &str,
            line_ids: Vec<String>,
        ) -> Result<Cart, CommerceError> {
            self.begin("remove").await?;
            let mut server = self.inner.server.lock().unwrap();
            let cart = server
                .carts
                .get_mut(cart_id)
                .ok_or_else(|| CommerceError::NotFound(format!("Cart not found: {cart_id}")))?;
            cart.retain(|(line_id, _, _)| !line_ids.contains(line_id));
            Ok(server.render(cart_id).expect("cart exists"))
        }
    }

    /// In-memory stand-in for the session-backed id store.
    #[derive(Clone, Default)]
    struct MemoryCartIds {
        id: Arc<StdMutex<Option<String>>>,
    }

    impl MemoryCartIds {
        fn preload(cart_id: &str) -> Self {
            let ids = Self::default();
            *ids.id.lock().unwrap() = Some(cart_id.to_string());
            ids
        }

        fn stored(&self) -> Option<String> {
            self.id.lock().unwrap().clone()
        }
    }

    impl CartIdStore for MemoryCartIds {
        async fn get(&self) -> Result<Option<String>, CartError> {
            Ok(self.id.lock().unwrap().clone())
        }

        async fn set(&self, cart_id: &str) -> Result<(), CartError> {
            *self.id.lock().unwrap() = Some(cart_id.to_string());
            Ok(())
        }

        async fn clear(&self) -> Result<(), CartError> {
            *self.id.lock().unwrap() = None;
            Ok(())
        }
    }

    fn store_with(api: &FakeCartApi, ids: &MemoryCartIds) -> CartStore<FakeCartApi, MemoryCartIds> {
        CartStore::new(api.clone(), ids.clone())
    }

    #[tokio::test]
    async fn test_first_add_creates_cart_and_persists_id() {
        let api = FakeCartApi::new();
        let ids = MemoryCartIds::default();
        let store = store_with(&api, &ids);

        store.add_line("variant-1", 1).await.expect("add should succeed");

        assert_eq!(api.calls(), vec!["create"]);
        let persisted = ids.stored().expect("cart id should be persisted");

        let view = store.snapshot().await;
        assert_eq!(view.count, 1);
        assert_eq!(view.items.len(), 1);
        assert!(view.panel_open);

        // The second add reuses the persisted id: an add call, not a create.
        store.add_line("variant-2", 2).await.expect("add should succeed");
        assert_eq!(api.calls(), vec!["create", "add"]);
        assert_eq!(ids.stored().expect("id still persisted"), persisted);
        assert_eq!(store.snapshot().await.count, 3);
    }

    #[tokio::test]
    async fn test_projection_matches_server_totals() {
        let api = FakeCartApi::new();
        let ids = MemoryCartIds::default();
        let store = store_with(&api, &ids);

        store.add_line("variant-1", 2).await.expect("add");
        store.add_line("variant-2", 3).await.expect("add");

        let view = store.snapshot().await;
        let line_sum: i64 = view.items.iter().map(|line| line.quantity).sum();
        assert_eq!(view.count, line_sum);

        // Subtotal display is the server's totalAmount verbatim: 5 * 4.99.
        let subtotal = view.subtotal.expect("cart has a subtotal");
        assert_eq!(subtotal.amount, "24.95");
    }

    #[tokio::test]
    async fn test_update_to_zero_collapses_to_removal() {
        let api = FakeCartApi::new();
        let ids = MemoryCartIds::default();
        let store = store_with(&api, &ids);

        store.add_line("variant-1", 2).await.expect("add");
        let line_id = store.snapshot().await.items.first().expect("one line").id.clone();

        store
            .update_line_quantity(&line_id, 0)
            .await
            .expect("update to zero should succeed");

        // A removal went out; no update request carried the zero.
        assert_eq!(api.calls(), vec!["create", "remove"]);
        let view = store.snapshot().await;
        assert_eq!(view.count, 0);
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn test_negative_quantity_also_collapses_to_removal() {
        let api = FakeCartApi::new();
        let ids = MemoryCartIds::default();
        let store = store_with(&api, &ids);

        store.add_line("variant-1", 1).await.expect("add");
        let line_id = store.snapshot().await.items.first().expect("one line").id.clone();

        store
            .update_line_quantity(&line_id, -3)
            .await
            .expect("negative update should succeed as removal");

        assert_eq!(api.calls(), vec!["create", "remove"]);
        assert!(store.snapshot().await.items.is_empty());
    }

    #[tokio::test]
    async fn test_positive_update_issues_update_request() {
        let api = FakeCartApi::new();
        let ids = MemoryCartIds::default();
        let store = store_with(&api, &ids);

        store.add_line("variant-1", 2).await.expect("add");
        let line_id = store.snapshot().await.items.first().expect("one line").id.clone();

        store.update_line_quantity(&line_id, 5).await.expect("update");

        assert_eq!(api.calls(), vec!["create", "update"]);
        let view = store.snapshot().await;
        assert_eq!(view.count, 5);
        assert_eq!(view.subtotal.expect("subtotal present").amount, "24.95");
    }

    #[tokio::test]
    async fn test_load_restores_cart_from_persisted_id() {
        let api = FakeCartApi::new();
        let cart_id = api.seed_cart(&[("variant-1", 2)]);
        let ids = MemoryCartIds::preload(&cart_id);
        let store = store_with(&api, &ids);

        store.load().await;

        let view = store.snapshot().await;
        assert_eq!(view.count, 2);
        assert!(!view.panel_open);
        assert_eq!(ids.stored().expect("id kept"), cart_id);
    }

    #[tokio::test]
    async fn test_load_with_stale_id_clears_it_silently() {
        let api = FakeCartApi::new();
        let cart_id = api.seed_cart(&[("variant-1", 1)]);
        api.forget_cart(&cart_id);
        let ids = MemoryCartIds::preload(&cart_id);
        let store = store_with(&api, &ids);

        store.load().await;

        let view = store.snapshot().await;
        assert_eq!(view.count, 0);
        assert!(view.items.is_empty());
        assert!(ids.stored().is_none(), "stale id should be cleared");
    }

    #[tokio::test]
    async fn test_load_keeps_id_on_transient_failure() {
        let api = FakeCartApi::new();
        let cart_id = api.seed_cart(&[("variant-1", 2)]);
        let ids = MemoryCartIds::preload(&cart_id);
        let store = store_with(&api, &ids);

        api.fail_next_call();
        store.load().await;

        // State stays empty but the id survives for a later visit.
        assert_eq!(store.snapshot().await.count, 0);
        assert_eq!(ids.stored().expect("id kept"), cart_id);
    }

    #[tokio::test]
    async fn test_stale_id_heals_on_next_add() {
        let api = FakeCartApi::new();
        let cart_id = api.seed_cart(&[("variant-1", 1)]);
        api.forget_cart(&cart_id);
        let ids = MemoryCartIds::preload(&cart_id);
        let store = store_with(&api, &ids);

        store.load().await;
        store.add_line("variant-2", 1).await.expect("add after reset");

        // The cleared id makes the add a create, minting a fresh cart.
        assert_eq!(api.calls(), vec!["get", "create"]);
        assert_ne!(ids.stored().expect("new id persisted"), cart_id);
        assert_eq!(store.snapshot().await.count, 1);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_state_untouched() {
        let api = FakeCartApi::new();
        let ids = MemoryCartIds::default();
        let store = store_with(&api, &ids);

        store.add_line("variant-1", 2).await.expect("add");
        let before = store.snapshot().await;

        api.fail_next_call();
        let err = store
            .add_line("variant-2", 1)
            .await
            .expect_err("injected failure should surface");
        assert!(matches!(err, CartError::Api(_)));

        let after = store.snapshot().await;
        assert_eq!(after.count, before.count);
        assert_eq!(after.items.len(), before.items.len());
        assert_eq!(
            after.subtotal.expect("subtotal present").amount,
            before.subtotal.expect("subtotal present").amount
        );
    }

    #[tokio::test]
    async fn test_update_without_cart_reports_no_active_cart() {
        let api = FakeCartApi::new();
        let ids = MemoryCartIds::default();
        let store = store_with(&api, &ids);

        let err = store
            .update_line_quantity("line-1", 2)
            .await
            .expect_err("no cart to update");
        assert!(matches!(err, CartError::NoActiveCart));
        assert!(api.calls().is_empty(), "no request should be issued");
    }

    #[tokio::test]
    async fn test_busy_while_mutation_in_flight() {
        let api = FakeCartApi::new();
        let ids = MemoryCartIds::default();
        let store = Arc::new(store_with(&api, &ids));
        assert!(!store.is_busy());

        let gate = api.hold_next_call();
        let task = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_line("variant-1", 1).await })
        };

        // Wait for the spawned mutation to reach the held API call.
        while !store.is_busy() {
            tokio::task::yield_now().await;
        }

        gate.notify_one();
        task.await
            .expect("task should not panic")
            .expect("add should succeed");
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn test_overlapping_mutations_run_one_at_a_time() {
        let api = FakeCartApi::new();
        let ids = MemoryCartIds::default();
        let store = Arc::new(store_with(&api, &ids));

        store.add_line("variant-1", 1).await.expect("add");

        let gate = api.hold_next_call();
        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_line("variant-2", 1).await })
        };
        while !store.is_busy() {
            tokio::task::yield_now().await;
        }

        // Queue a second mutation behind the held one.
        let second = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_line("variant-3", 1).await })
        };
        tokio::task::yield_now().await;

        gate.notify_one();
        first.await.expect("no panic").expect("first add");
        second.await.expect("no panic").expect("second add");

        // Both adds landed after the create, one at a time.
        assert_eq!(api.calls(), vec!["create", "add", "add"]);
        assert_eq!(store.snapshot().await.count, 3);
    }
}
