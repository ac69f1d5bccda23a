//! Routes chat events to gateway calls and builds the replies.
//!
//! The dispatcher is platform-neutral: the runner converts Telegram updates
//! into [`Inbound`] events and sends the returned [`Outbound`] messages.
//! Every event produces at least one reply, including on gateway failure.

use tracing::{debug, info, instrument, warn};

use petal_core::{Capability, OrderId, PhoneNumber, ProductId, StatusAction, TelegramId, UserId};

use crate::commands::{Callback, Command, CommandError};
use crate::gateway::{GatewayApi, GatewayError, Identity, Order};
use crate::render;
use crate::reply::{Outbound, Reply};
use crate::session::{ChatState, SessionStore};

/// An incoming chat event from a private chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A text message or command.
    Text { from: TelegramId, text: String },
    /// A shared contact. `contact_user` is the account the contact belongs to.
    Contact {
        from: TelegramId,
        phone: String,
        contact_user: Option<TelegramId>,
    },
    /// An inline button press.
    Callback { from: TelegramId, data: String },
}

impl Inbound {
    /// Account that sent the event.
    #[must_use]
    pub const fn from(&self) -> TelegramId {
        match self {
            Self::Text { from, .. } | Self::Contact { from, .. } | Self::Callback { from, .. } => {
                *from
            }
        }
    }
}

/// A handler either replies with success or with the failure message.
type Step = Result<Reply, Reply>;

/// Reply to the sender plus optional messages for other chats.
struct Handled {
    reply: Reply,
    notices: Vec<Outbound>,
}

impl From<Reply> for Handled {
    fn from(reply: Reply) -> Self {
        Self {
            reply,
            notices: Vec::new(),
        }
    }
}

impl From<Step> for Handled {
    fn from(step: Step) -> Self {
        match step {
            Ok(reply) | Err(reply) => reply.into(),
        }
    }
}

/// Chat event dispatcher.
pub struct Dispatcher<G, S> {
    gateway: G,
    sessions: S,
    /// Chat told about new registrations.
    admin_chat: Option<TelegramId>,
}

impl<G: GatewayApi, S: SessionStore> Dispatcher<G, S> {
    #[must_use]
    pub const fn new(gateway: G, sessions: S, admin_chat: Option<TelegramId>) -> Self {
        Self {
            gateway,
            sessions,
            admin_chat,
        }
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn sessions(&self) -> &S {
        &self.sessions
    }

    /// Handle one event and return the messages to send.
    #[instrument(skip(self, event), fields(from = %event.from()))]
    pub async fn handle(&self, event: Inbound) -> Vec<Outbound> {
        let from = event.from();
        let handled = match event {
            Inbound::Text { text, .. } => self.on_text(from, &text).await,
            Inbound::Contact {
                phone,
                contact_user,
                ..
            } => self.on_contact(from, &phone, contact_user).await,
            Inbound::Callback { data, .. } => self.on_callback(from, &data).await,
        };

        let mut out = vec![Outbound {
            chat_id: from.as_i64(),
            reply: handled.reply,
        }];
        out.extend(handled.notices);
        out
    }

    async fn on_text(&self, from: TelegramId, text: &str) -> Handled {
        match Command::parse(text) {
            Some(Ok(command)) => self.on_command(from, command).await,
            Some(Err(CommandError::Unknown(name))) => render::unknown_command(&name).into(),
            Some(Err(CommandError::Usage(hint))) => render::usage(hint).into(),
            None => self.on_plain_text(from, text).await,
        }
    }

    async fn on_command(&self, from: TelegramId, command: Command) -> Handled {
        match command {
            Command::Start => self.start(from).await.into(),
            Command::Help => {
                let role = self
                    .gateway
                    .identity(from)
                    .await
                    .ok()
                    .flatten()
                    .map(|identity| identity.user.role);
                render::help(role).into()
            }
            Command::Cancel => {
                self.sessions.take(from).await;
                render::flow_canceled().into()
            }
            Command::Link(user_id) => self.link(from, user_id).await.into(),
            Command::Products => self.products().await.into(),
            Command::Orders => self.orders(from).await.into(),
            Command::Order(id) => self.order(from, id).await.into(),
            Command::NewOrder(product_ids) => self.new_order(from, product_ids).await.into(),
            Command::Analytics => self.analytics(from).await.into(),
        }
    }

    async fn on_plain_text(&self, from: TelegramId, text: &str) -> Handled {
        match self.sessions.get(from).await {
            ChatState::Idle => render::not_understood().into(),
            ChatState::AwaitingName => {
                let name = text.trim();
                if name.is_empty() {
                    return render::invalid_name().into();
                }
                self.sessions
                    .set(
                        from,
                        ChatState::AwaitingPhone {
                            name: name.to_string(),
                        },
                    )
                    .await;
                render::ask_phone(name).into()
            }
            ChatState::AwaitingPhone { name } => self.register(from, name, text).await,
            ChatState::ChoosingAddress { product_ids }
            | ChatState::AwaitingDeliveryAddress { product_ids } => {
                self.place_with_new_address(from, product_ids, text)
                    .await
                    .into()
            }
        }
    }

    async fn on_contact(
        &self,
        from: TelegramId,
        phone: &str,
        contact_user: Option<TelegramId>,
    ) -> Handled {
        let ChatState::AwaitingPhone { name } = self.sessions.get(from).await else {
            return render::not_understood().into();
        };
        if contact_user.is_some_and(|owner| owner != from) {
            return render::foreign_contact().into();
        }
        self.register(from, name, phone).await
    }

    async fn on_callback(&self, from: TelegramId, data: &str) -> Handled {
        let Some(callback) = Callback::parse(data) else {
            warn!(data, "Rejected malformed callback data");
            return render::malformed_callback().into();
        };

        match callback {
            Callback::Orders | Callback::Refresh => self.orders(from).await.into(),
            Callback::Analytics => self.analytics(from).await.into(),
            Callback::ShowOrder(id) => self.order(from, id).await.into(),
            Callback::Status(action, id) => self.change_status(from, action, id).await.into(),
            Callback::UseSavedAddress => self.place_with_saved_address(from).await.into(),
            Callback::NewAddress => {
                let ChatState::ChoosingAddress { product_ids } = self.sessions.get(from).await
                else {
                    return render::no_pending_order().into();
                };
                self.sessions
                    .set(from, ChatState::AwaitingDeliveryAddress { product_ids })
                    .await;
                render::ask_address().into()
            }
        }
    }

    /// Log a gateway failure and turn it into a reply.
    fn failure(error: &GatewayError) -> Reply {
        if error.is_unavailable() {
            warn!(error = %error, "Gateway call failed");
        } else {
            debug!(error = %error, "Gateway rejected request");
        }
        render::gateway_error(error)
    }

    /// Resolve the sender to a registered identity.
    async fn identity(&self, from: TelegramId) -> Result<Identity, Reply> {
        match self.gateway.identity(from).await {
            Ok(Some(identity)) => Ok(identity),
            Ok(None) => Err(render::not_registered()),
            Err(e) => Err(Self::failure(&e)),
        }
    }

    async fn start(&self, from: TelegramId) -> Step {
        match self.gateway.identity(from).await.map_err(|e| Self::failure(&e))? {
            Some(identity) => {
                self.sessions.set(from, ChatState::Idle).await;
                Ok(render::welcome_back(&identity.user))
            }
            None => {
                self.sessions.set(from, ChatState::AwaitingName).await;
                Ok(render::ask_name())
            }
        }
    }

    async fn link(&self, from: TelegramId, user_id: UserId) -> Step {
        let identity = self
            .gateway
            .link(from, user_id)
            .await
            .map_err(|e| Self::failure(&e))?;
        self.sessions.set(from, ChatState::Idle).await;
        info!(user_id = %identity.user.id, "Chat linked to user");
        Ok(render::linked(&identity.user))
    }

    async fn register(&self, from: TelegramId, name: String, raw_phone: &str) -> Handled {
        let phone = match PhoneNumber::parse(raw_phone) {
            Ok(phone) => phone,
            Err(e) => return render::invalid_phone(&e.to_string()).into(),
        };

        let identity = match self.gateway.register(from, &name, phone.as_str()).await {
            Ok(identity) => identity,
            // The state stays, so the user can retry or /cancel.
            Err(e) => return Self::failure(&e).into(),
        };
        self.sessions.set(from, ChatState::Idle).await;
        info!(user_id = %identity.user.id, "Customer registered from chat");

        let notices = self
            .admin_chat
            .filter(|admin| *admin != from)
            .map(|admin| Outbound {
                chat_id: admin.as_i64(),
                reply: render::new_customer(&identity.user, phone.as_str()),
            })
            .into_iter()
            .collect();

        Handled {
            reply: render::registered(&identity.user),
            notices,
        }
    }

    async fn products(&self) -> Step {
        let products = self
            .gateway
            .products()
            .await
            .map_err(|e| Self::failure(&e))?;
        Ok(render::product_list(&products))
    }

    async fn orders(&self, from: TelegramId) -> Step {
        let identity = self.identity(from).await?;
        let orders = self
            .gateway
            .orders(&identity.token)
            .await
            .map_err(|e| Self::failure(&e))?;
        Ok(render::order_list(&orders, identity.user.role))
    }

    async fn order(&self, from: TelegramId, id: OrderId) -> Step {
        let identity = self.identity(from).await?;
        let order = self
            .gateway
            .order(&identity.token, id)
            .await
            .map_err(|e| Self::failure(&e))?;
        Ok(render::order_detail(&order, identity.user.role))
    }

    async fn analytics(&self, from: TelegramId) -> Step {
        let identity = self.identity(from).await?;
        if !identity.user.role.can(Capability::ViewReports) {
            return Err(render::no_permission());
        }
        let report = self
            .gateway
            .latest_report(&identity.token)
            .await
            .map_err(|e| Self::failure(&e))?;
        Ok(render::report(report.as_ref()))
    }

    async fn change_status(&self, from: TelegramId, action: StatusAction, id: OrderId) -> Step {
        let identity = self.identity(from).await?;
        if !identity.user.role.can(Capability::ChangeOrderStatus) {
            return Err(render::no_permission());
        }
        let change = self
            .gateway
            .update_status(&identity.token, id, action.target())
            .await
            .map_err(|e| Self::failure(&e))?;
        info!(
            order_id = %id,
            status = %change.order.status,
            changed = change.changed,
            "Order status updated from chat"
        );
        Ok(render::status_changed(&change))
    }

    /// Start checkout: offer the saved address or ask for one.
    async fn new_order(&self, from: TelegramId, product_ids: Vec<ProductId>) -> Step {
        let identity = self.identity(from).await?;
        let saved = self
            .gateway
            .address(&identity.token)
            .await
            .map_err(|e| Self::failure(&e))?
            .filter(|address| !address.trim().is_empty());

        if let Some(saved) = saved {
            self.sessions
                .set(from, ChatState::ChoosingAddress { product_ids })
                .await;
            Ok(render::choose_address(&saved))
        } else {
            self.sessions
                .set(from, ChatState::AwaitingDeliveryAddress { product_ids })
                .await;
            Ok(render::ask_address())
        }
    }

    async fn place_with_saved_address(&self, from: TelegramId) -> Step {
        let ChatState::ChoosingAddress { product_ids } = self.sessions.get(from).await else {
            return Err(render::no_pending_order());
        };
        let identity = self.identity(from).await?;
        let placed = self
            .gateway
            .create_order(&identity.token, &product_ids, None)
            .await;
        self.finish_checkout(from, placed).await
    }

    /// Save a typed address and place the pending order with it.
    async fn place_with_new_address(
        &self,
        from: TelegramId,
        product_ids: Vec<ProductId>,
        text: &str,
    ) -> Step {
        let address = text.trim();
        if address.is_empty() {
            return Err(render::blank_address());
        }
        let identity = self.identity(from).await?;
        let placed = match self.gateway.save_address(&identity.token, address).await {
            Ok(_) => {
                self.gateway
                    .create_order(&identity.token, &product_ids, Some(address))
                    .await
            }
            Err(e) => Err(e),
        };
        self.finish_checkout(from, placed).await
    }

    /// End the checkout flow, unless the gateway was unreachable and the
    /// user may simply try again.
    async fn finish_checkout(&self, from: TelegramId, placed: Result<Order, GatewayError>) -> Step {
        match placed {
            Ok(order) => {
                self.sessions.set(from, ChatState::Idle).await;
                info!(order_id = %order.id, "Order placed from chat");
                Ok(render::order_placed(&order))
            }
            Err(e) => {
                if !e.is_unavailable() {
                    self.sessions.set(from, ChatState::Idle).await;
                }
                Err(Self::failure(&e))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use petal_core::{OrderStatus, Price, Role};

    use super::*;
    use crate::gateway::{Product, Report, StatusChange, User};
    use crate::reply::Keyboard;
    use crate::session::InMemorySessions;

    const ADMIN_CHAT: TelegramId = TelegramId::new(1);
    const STAFF: TelegramId = TelegramId::new(100);
    const CUSTOMER: TelegramId = TelegramId::new(200);
    const STRANGER: TelegramId = TelegramId::new(300);

    /// Gateway double that records every call.
    #[derive(Default)]
    struct FakeGateway {
        identities: Mutex<HashMap<TelegramId, Identity>>,
        orders: Mutex<Vec<Order>>,
        address: Mutex<Option<String>>,
        down: Mutex<bool>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGateway {
        fn record(&self, call: String) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push(call);
            if *self.down.lock().unwrap() {
                Err(GatewayError::Unavailable("connection refused".to_string()))
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn add_identity(&self, telegram_id: TelegramId, id: i32, role: Role) {
            self.identities.lock().unwrap().insert(
                telegram_id,
                Identity {
                    user: user(id, role),
                    token: format!("token-{id}"),
                },
            );
        }

        fn add_order(&self, id: i32, owner: i32, status: OrderStatus) {
            self.orders.lock().unwrap().push(order(id, owner, status, None));
        }
    }

    fn user(id: i32, role: Role) -> User {
        User {
            id: UserId::new(id),
            username: format!("user{id}"),
            display_name: None,
            role,
        }
    }

    fn order(id: i32, owner: i32, status: OrderStatus, address: Option<&str>) -> Order {
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(owner),
            products: vec![Product {
                id: ProductId::new(1),
                name: "Roses".to_string(),
                price: Price::from_cents(1000),
            }],
            status,
            created_at: Utc::now(),
            delivery_address: address.map(str::to_string),
            total_price: Price::from_cents(1000),
        }
    }

    #[async_trait]
    impl GatewayApi for FakeGateway {
        async fn identity(
            &self,
            telegram_id: TelegramId,
        ) -> Result<Option<Identity>, GatewayError> {
            self.record(format!("identity {telegram_id}"))?;
            Ok(self.identities.lock().unwrap().get(&telegram_id).cloned())
        }

        async fn register(
            &self,
            telegram_id: TelegramId,
            name: &str,
            phone: &str,
        ) -> Result<Identity, GatewayError> {
            self.record(format!("register {telegram_id} {name} {phone}"))?;
            let identity = Identity {
                user: User {
                    display_name: Some(name.to_string()),
                    ..user(50, Role::Customer)
                },
                token: "token-50".to_string(),
            };
            self.identities
                .lock()
                .unwrap()
                .insert(telegram_id, identity.clone());
            Ok(identity)
        }

        async fn link(
            &self,
            telegram_id: TelegramId,
            user_id: UserId,
        ) -> Result<Identity, GatewayError> {
            self.record(format!("link {telegram_id} {user_id}"))?;
            Err(GatewayError::NotFound("user not found".to_string()))
        }

        async fn products(&self) -> Result<Vec<Product>, GatewayError> {
            self.record("products".to_string())?;
            Ok(vec![])
        }

        async fn orders(&self, token: &str) -> Result<Vec<Order>, GatewayError> {
            self.record(format!("orders {token}"))?;
            Ok(self.orders.lock().unwrap().clone())
        }

        async fn order(&self, token: &str, id: OrderId) -> Result<Order, GatewayError> {
            self.record(format!("order {token} {id}"))?;
            self.orders
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.id == id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound("order not found".to_string()))
        }

        async fn update_status(
            &self,
            token: &str,
            id: OrderId,
            status: OrderStatus,
        ) -> Result<StatusChange, GatewayError> {
            self.record(format!("update_status {token} {id} {status}"))?;
            let mut orders = self.orders.lock().unwrap();
            let order = orders
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or_else(|| GatewayError::NotFound("order not found".to_string()))?;
            let changed = order.status != status;
            order.status = status;
            Ok(StatusChange {
                changed,
                order: order.clone(),
            })
        }

        async fn create_order(
            &self,
            token: &str,
            product_ids: &[ProductId],
            delivery_address: Option<&str>,
        ) -> Result<Order, GatewayError> {
            self.record(format!(
                "create_order {token} {product_ids:?} {delivery_address:?}"
            ))?;
            let address = delivery_address
                .map(str::to_string)
                .or_else(|| self.address.lock().unwrap().clone());
            Ok(order(
                99,
                50,
                OrderStatus::Pending,
                address.as_deref(),
            ))
        }

        async fn address(&self, token: &str) -> Result<Option<String>, GatewayError> {
            self.record(format!("address {token}"))?;
            Ok(self.address.lock().unwrap().clone())
        }

        async fn save_address(
            &self,
            token: &str,
            address: &str,
        ) -> Result<Option<String>, GatewayError> {
            self.record(format!("save_address {token} {address}"))?;
            *self.address.lock().unwrap() = Some(address.to_string());
            Ok(Some(address.to_string()))
        }

        async fn latest_report(&self, token: &str) -> Result<Option<Report>, GatewayError> {
            self.record(format!("latest_report {token}"))?;
            Ok(None)
        }
    }

    fn dispatcher() -> Dispatcher<FakeGateway, InMemorySessions> {
        let gateway = FakeGateway::default();
        gateway.add_identity(STAFF, 1, Role::Staff);
        gateway.add_identity(CUSTOMER, 2, Role::Customer);
        gateway.add_order(17, 2, OrderStatus::Pending);
        Dispatcher::new(gateway, InMemorySessions::new(), Some(ADMIN_CHAT))
    }

    fn text(from: TelegramId, text: &str) -> Inbound {
        Inbound::Text {
            from,
            text: text.to_string(),
        }
    }

    fn callback(from: TelegramId, data: &str) -> Inbound {
        Inbound::Callback {
            from,
            data: data.to_string(),
        }
    }

    async fn reply(d: &Dispatcher<FakeGateway, InMemorySessions>, event: Inbound) -> Reply {
        let mut out = d.handle(event).await;
        assert_eq!(out.len(), 1, "expected a single reply");
        out.remove(0).reply
    }

    #[tokio::test]
    async fn test_unregistered_start_asks_for_name() {
        let d = dispatcher();

        let reply = reply(&d, text(STRANGER, "/start")).await;

        assert!(reply.text.contains("What is your name?"));
        assert_eq!(d.sessions().get(STRANGER).await, ChatState::AwaitingName);
        assert_eq!(d.gateway().calls(), vec!["identity 300"]);
    }

    #[tokio::test]
    async fn test_registered_start_shows_menu() {
        let d = dispatcher();
        let reply = reply(&d, text(STAFF, "/start")).await;
        assert!(reply.text.contains("Welcome back"));
        assert_eq!(reply.button_data(), vec!["orders", "analytics"]);
    }

    #[tokio::test]
    async fn test_registration_flow_with_contact() {
        let d = dispatcher();
        reply(&d, text(STRANGER, "/start")).await;

        let reply_name = reply(&d, text(STRANGER, "  Anna ")).await;
        assert!(matches!(
            reply_name.keyboard,
            Some(Keyboard::RequestContact(_))
        ));
        assert_eq!(
            d.sessions().get(STRANGER).await,
            ChatState::AwaitingPhone {
                name: "Anna".to_string()
            }
        );

        let out = d
            .handle(Inbound::Contact {
                from: STRANGER,
                phone: "+7 912 345-67-89".to_string(),
                contact_user: Some(STRANGER),
            })
            .await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chat_id, 300);
        assert!(out[0].reply.text.contains("registered, Anna"));
        assert_eq!(out[0].reply.keyboard, Some(Keyboard::Remove));
        assert_eq!(out[1].chat_id, 1);
        assert!(out[1].reply.text.contains("New customer: Anna"));

        assert!(
            d.gateway()
                .calls()
                .contains(&"register 300 Anna +79123456789".to_string())
        );
        assert_eq!(d.sessions().get(STRANGER).await, ChatState::Idle);
    }

    #[tokio::test]
    async fn test_registration_rejects_foreign_contact_and_bad_phone() {
        let d = dispatcher();
        d.sessions()
            .set(
                STRANGER,
                ChatState::AwaitingPhone {
                    name: "Anna".to_string(),
                },
            )
            .await;

        let foreign = reply(
            &d,
            Inbound::Contact {
                from: STRANGER,
                phone: "+79123456789".to_string(),
                contact_user: Some(TelegramId::new(999)),
            },
        )
        .await;
        assert!(foreign.text.contains("your own contact"));

        let bad = reply(&d, text(STRANGER, "call me maybe")).await;
        assert!(bad.text.contains("phone number"));

        assert!(d.gateway().calls().is_empty());
        assert!(matches!(
            d.sessions().get(STRANGER).await,
            ChatState::AwaitingPhone { .. }
        ));
    }

    #[tokio::test]
    async fn test_confirm_callback_moves_pending_to_processing() {
        let d = dispatcher();

        let reply = reply(&d, callback(STAFF, "confirm_17")).await;

        assert!(reply.text.contains("Order #17 is now In progress"));
        assert_eq!(
            d.gateway().calls(),
            vec!["identity 100", "update_status token-1 17 processing"]
        );
        assert_eq!(
            reply.button_data(),
            vec!["in_delivery_17", "complete_17", "cancel_17"]
        );
    }

    #[tokio::test]
    async fn test_repeated_status_is_reported_unchanged() {
        let d = dispatcher();
        reply(&d, callback(STAFF, "confirm_17")).await;
        let again = reply(&d, callback(STAFF, "confirm_17")).await;
        assert!(again.text.contains("already In progress"));
    }

    #[tokio::test]
    async fn test_malformed_callback_never_reaches_gateway() {
        let d = dispatcher();
        for data in ["confirm_abc", "confirm_17_3", "teleport_17", "confirm_"] {
            let reply = reply(&d, callback(STAFF, data)).await;
            assert!(reply.text.contains("no longer valid"), "{data}");
        }
        assert!(d.gateway().calls().is_empty());
    }

    #[tokio::test]
    async fn test_customer_cannot_change_status() {
        let d = dispatcher();
        let reply = reply(&d, callback(CUSTOMER, "cancel_17")).await;
        assert!(reply.text.contains("permission"));
        assert_eq!(d.gateway().calls(), vec!["identity 200"]);
    }

    #[tokio::test]
    async fn test_analytics_is_staff_only() {
        let d = dispatcher();

        let denied = reply(&d, text(CUSTOMER, "/analytics")).await;
        assert!(denied.text.contains("permission"));

        let empty = reply(&d, callback(STAFF, "analytics")).await;
        assert!(empty.text.contains("No orders"));
        assert_eq!(
            d.gateway().calls(),
            vec!["identity 200", "identity 100", "latest_report token-1"]
        );
    }

    #[tokio::test]
    async fn test_order_detail_and_usage_hint() {
        let d = dispatcher();

        let detail = reply(&d, text(CUSTOMER, "/order 17")).await;
        assert!(detail.text.contains("Order #17"));
        assert!(detail.keyboard.is_none());

        let usage = reply(&d, text(CUSTOMER, "/order abc")).await;
        assert!(usage.text.contains("/order <order id>"));

        let missing = reply(&d, text(CUSTOMER, "/order 5")).await;
        assert!(missing.text.contains("Not found"));
    }

    #[tokio::test]
    async fn test_unregistered_user_cannot_list_orders() {
        let d = dispatcher();
        let reply = reply(&d, text(STRANGER, "/orders")).await;
        assert!(reply.text.contains("not registered"));
    }

    #[tokio::test]
    async fn test_checkout_with_saved_address() {
        let d = dispatcher();
        *d.gateway().address.lock().unwrap() = Some("Main St 1".to_string());

        let choose = reply(&d, text(CUSTOMER, "/neworder 1 2")).await;
        assert_eq!(choose.button_data(), vec!["use_saved_address", "new_address"]);

        let placed = reply(&d, callback(CUSTOMER, "use_saved_address")).await;
        assert!(placed.text.contains("Order #99 placed"));
        assert!(placed.text.contains("Main St 1"));
        assert!(
            d.gateway()
                .calls()
                .contains(&"create_order token-2 [ProductId(1), ProductId(2)] None".to_string())
        );
        assert_eq!(d.sessions().get(CUSTOMER).await, ChatState::Idle);
    }

    #[tokio::test]
    async fn test_checkout_with_typed_address() {
        let d = dispatcher();

        let ask = reply(&d, text(CUSTOMER, "/neworder 1")).await;
        assert!(ask.text.contains("type the delivery address"));

        let blank = reply(&d, text(CUSTOMER, "   ")).await;
        assert!(blank.text.contains("can't be empty"));

        let placed = reply(&d, text(CUSTOMER, " Oak Ave 5 ")).await;
        assert!(placed.text.contains("Oak Ave 5"));
        let calls = d.gateway().calls();
        assert!(calls.contains(&"save_address token-2 Oak Ave 5".to_string()));
        assert!(
            calls.contains(&"create_order token-2 [ProductId(1)] Some(\"Oak Ave 5\")".to_string())
        );
    }

    #[tokio::test]
    async fn test_new_address_button_switches_to_typing() {
        let d = dispatcher();
        *d.gateway().address.lock().unwrap() = Some("Main St 1".to_string());
        reply(&d, text(CUSTOMER, "/neworder 3")).await;

        let ask = reply(&d, callback(CUSTOMER, "new_address")).await;
        assert!(ask.text.contains("type the delivery address"));
        assert_eq!(
            d.sessions().get(CUSTOMER).await,
            ChatState::AwaitingDeliveryAddress {
                product_ids: vec![ProductId::new(3)]
            }
        );
    }

    #[tokio::test]
    async fn test_address_button_without_pending_order() {
        let d = dispatcher();
        let reply = reply(&d, callback(CUSTOMER, "use_saved_address")).await;
        assert!(reply.text.contains("no order in progress"));
        assert!(d.gateway().calls().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_outage_is_reported_and_checkout_kept() {
        let d = dispatcher();
        reply(&d, text(CUSTOMER, "/neworder 1")).await;
        *d.gateway().down.lock().unwrap() = true;

        let failed = reply(&d, text(CUSTOMER, "Oak Ave 5")).await;
        assert!(failed.text.contains("unavailable"));
        assert_eq!(
            d.sessions().get(CUSTOMER).await,
            ChatState::AwaitingDeliveryAddress {
                product_ids: vec![ProductId::new(1)]
            }
        );

        let orders = reply(&d, text(STAFF, "/orders")).await;
        assert!(orders.text.contains("unavailable"));
    }

    #[tokio::test]
    async fn test_cancel_clears_flow() {
        let d = dispatcher();
        d.sessions().set(STRANGER, ChatState::AwaitingName).await;
        let reply = reply(&d, text(STRANGER, "/cancel")).await;
        assert!(reply.text.contains("canceled"));
        assert_eq!(d.sessions().get(STRANGER).await, ChatState::Idle);
    }

    #[tokio::test]
    async fn test_link_failure_is_reported() {
        let d = dispatcher();
        let reply = reply(&d, text(STRANGER, "/link 42")).await;
        assert!(reply.text.contains("Not found"));
    }

    #[tokio::test]
    async fn test_plain_text_outside_flow() {
        let d = dispatcher();
        let reply = reply(&d, text(CUSTOMER, "hello")).await;
        assert!(reply.text.contains("/help"));
    }
}
