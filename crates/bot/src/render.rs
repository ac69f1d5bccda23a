//! Chat message builders.
//!
//! Every reply the bot sends is built here, so wording and button payloads
//! stay consistent between flows.

use petal_core::{Capability, OrderStatus, Role, StatusAction};

use crate::commands::Callback;
use crate::gateway::{GatewayError, Order, Product, Report, StatusChange, User};
use crate::reply::{Button, Keyboard, Reply};

/// Most orders listed in one message.
pub const MAX_LISTED_ORDERS: usize = 20;

/// Main menu buttons for a role.
fn menu(role: Role) -> Vec<Vec<Button>> {
    let mut row = vec![Button::new("📋 Orders", Callback::ORDERS)];
    if role.can(Capability::ViewReports) {
        row.push(Button::new("📊 Analytics", Callback::ANALYTICS));
    }
    vec![row]
}

/// Greeting for a registered user.
#[must_use]
pub fn welcome_back(user: &User) -> Reply {
    Reply::text(format!(
        "🌸 Welcome back, {}!\nUse /orders to see your orders or /products to browse the catalog.",
        user.name()
    ))
    .with_buttons(menu(user.role))
}

/// First step of registration.
#[must_use]
pub fn ask_name() -> Reply {
    Reply::text("🌸 Welcome to Petal! Let's get you registered.\nWhat is your name?")
}

/// Second step of registration.
#[must_use]
pub fn ask_phone(name: &str) -> Reply {
    Reply::text(format!(
        "Nice to meet you, {name}! Please share your phone number with the button below, or type it."
    ))
    .with_keyboard(Keyboard::RequestContact("📱 Share phone number".to_string()))
}

/// Registration completed.
#[must_use]
pub fn registered(user: &User) -> Reply {
    Reply::text(format!(
        "✅ You're registered, {}! Use /products to browse and /neworder to order.",
        user.name()
    ))
    .with_keyboard(Keyboard::Remove)
}

/// Chat linked to an existing account.
#[must_use]
pub fn linked(user: &User) -> Reply {
    Reply::text(format!(
        "🔗 This chat is now linked to {} ({}).",
        user.username,
        user.role
    ))
    .with_buttons(menu(user.role))
}

/// Admin notice about a new customer.
#[must_use]
pub fn new_customer(user: &User, phone: &str) -> Reply {
    Reply::text(format!(
        "🆕 New customer: {} (user #{}, {phone})",
        user.name(),
        user.id
    ))
}

#[must_use]
pub fn invalid_name() -> Reply {
    Reply::text("⚠ Please send your name as text.")
}

#[must_use]
pub fn invalid_phone(reason: &str) -> Reply {
    Reply::text(format!("⚠ That doesn't look like a phone number: {reason}. Try again."))
}

/// Someone else's contact was shared.
#[must_use]
pub fn foreign_contact() -> Reply {
    Reply::text("⚠ Please share your own contact.")
}

/// A command that needs an account was sent from an unknown chat.
#[must_use]
pub fn not_registered() -> Reply {
    Reply::text("You are not registered yet. Send /start to sign up.")
}

/// The role lacks a capability.
#[must_use]
pub fn no_permission() -> Reply {
    Reply::text("⛔ You don't have permission to do that.")
}

/// Order list, newest first, with a detail button per order.
#[must_use]
pub fn order_list(orders: &[Order], role: Role) -> Reply {
    if orders.is_empty() {
        return Reply::text("You have no orders yet. Use /products and /neworder to place one.");
    }

    let title = if role.can(Capability::ViewAllOrders) {
        "📋 All orders:"
    } else {
        "📋 Your orders:"
    };
    let mut text = format!("{title}\n");
    let mut rows = Vec::new();
    for order in orders.iter().take(MAX_LISTED_ORDERS) {
        text.push_str(&format!(
            "\n🆔 {} | {} | {}",
            order.id,
            order.status.label(),
            order.total_price
        ));
        rows.push(vec![Button::new(
            format!("Order #{}", order.id),
            Callback::order_data(order.id),
        )]);
    }
    if orders.len() > MAX_LISTED_ORDERS {
        text.push_str(&format!(
            "\n\n…and {} more. Use /order <id> for details.",
            orders.len() - MAX_LISTED_ORDERS
        ));
    }
    rows.push(vec![Button::new("🔄 Refresh", Callback::REFRESH)]);

    Reply::text(text).with_buttons(rows)
}

/// Status buttons valid for the order's current status.
fn status_buttons(order: &Order) -> Vec<Button> {
    StatusAction::available_for(order.status)
        .into_iter()
        .map(|action| Button::new(action.label(), Callback::status_data(action, order.id)))
        .collect()
}

/// Order details. Staff also get the status buttons.
#[must_use]
pub fn order_detail(order: &Order, role: Role) -> Reply {
    let text = format!(
        "🛒 Order #{}\n📦 Items: {}\n💰 Total: {}\n📍 Delivery: {}\n📅 Placed: {}\n📌 Status: {}",
        order.id,
        order.product_names(),
        order.total_price,
        order.delivery_address.as_deref().unwrap_or("not set"),
        order.created_at.format("%Y-%m-%d %H:%M UTC"),
        order.status.label(),
    );
    let buttons = if role.can(Capability::ChangeOrderStatus) {
        status_buttons(order)
    } else {
        Vec::new()
    };
    Reply::text(text).with_buttons(vec![buttons])
}

/// Outcome of a status button.
#[must_use]
pub fn status_changed(change: &StatusChange) -> Reply {
    let order = &change.order;
    let text = if change.changed {
        format!("✅ Order #{} is now {}.", order.id, order.status.label())
    } else {
        format!("ℹ Order #{} is already {}.", order.id, order.status.label())
    };
    Reply::text(text).with_buttons(vec![status_buttons(order)])
}

/// Catalog listing.
#[must_use]
pub fn product_list(products: &[Product]) -> Reply {
    if products.is_empty() {
        return Reply::text("The catalog is empty right now.");
    }
    let mut text = String::from("💐 Catalog:\n");
    for product in products {
        text.push_str(&format!("\n{}. {} | {}", product.id, product.name, product.price));
    }
    text.push_str("\n\nOrder with /neworder <id> [id...]");
    Reply::text(text)
}

/// Ask whether to use the saved address.
#[must_use]
pub fn choose_address(saved: &str) -> Reply {
    Reply::text(format!("📍 Deliver to your saved address?\n{saved}")).with_buttons(vec![vec![
        Button::new("✅ Use saved address", Callback::USE_SAVED_ADDRESS),
        Button::new("✏ New address", Callback::NEW_ADDRESS),
    ]])
}

#[must_use]
pub fn ask_address() -> Reply {
    Reply::text("📍 Please type the delivery address.")
}

#[must_use]
pub fn blank_address() -> Reply {
    Reply::text("⚠ The address can't be empty. Please type the delivery address.")
}

/// Order placed.
#[must_use]
pub fn order_placed(order: &Order) -> Reply {
    Reply::text(format!(
        "🎉 Order #{} placed!\n📦 {}\n💰 Total: {}\n📍 {}",
        order.id,
        order.product_names(),
        order.total_price,
        order.delivery_address.as_deref().unwrap_or("no address"),
    ))
}

/// An address button was pressed with no order in progress.
#[must_use]
pub fn no_pending_order() -> Reply {
    Reply::text("There is no order in progress. Use /neworder to start one.")
}

/// Sales report summary.
#[must_use]
pub fn report(report: Option<&Report>) -> Reply {
    let Some(report) = report else {
        return Reply::text("📊 No orders in the report window yet.");
    };
    let figures = &report.figures;
    let mut text = format!(
        "📊 Sales report {} to {}\n",
        report.window_start, report.window_end
    );
    for status in OrderStatus::ALL {
        let line = figures.for_status(status);
        text.push_str(&format!(
            "\n{}: {} orders, {}",
            status.label(),
            line.orders,
            line.revenue
        ));
    }
    text.push_str(&format!(
        "\n\nTotal: {} orders, revenue {} (canceled excluded)",
        figures.total_orders, figures.total_revenue
    ));
    Reply::text(text)
}

/// Callback data that could not be parsed.
#[must_use]
pub fn malformed_callback() -> Reply {
    Reply::text("⚠ That button is no longer valid.")
}

#[must_use]
pub fn usage(hint: &str) -> Reply {
    Reply::text(format!("⚠ Usage: {hint}"))
}

#[must_use]
pub fn unknown_command(name: &str) -> Reply {
    Reply::text(format!("Unknown command /{name}. Send /help for the list."))
}

/// Plain text outside any flow.
#[must_use]
pub fn not_understood() -> Reply {
    Reply::text("I didn't get that. Send /help for the list of commands.")
}

#[must_use]
pub fn flow_canceled() -> Reply {
    Reply::text("Okay, canceled.").with_keyboard(Keyboard::Remove)
}

/// Command reference for a role.
#[must_use]
pub fn help(role: Option<Role>) -> Reply {
    let mut text = String::from(
        "/start - register or show the menu\n\
         /link <user id> - link this chat to an existing account\n\
         /products - browse the catalog\n\
         /neworder <id> [id...] - place an order\n\
         /orders - list orders\n\
         /order <id> - order details\n\
         /cancel - abort the current step",
    );
    if role.is_some_and(|r| r.can(Capability::ViewReports)) {
        text.push_str("\n/analytics - latest sales report");
    }
    Reply::text(text)
}

/// User-facing text for a gateway failure.
#[must_use]
pub fn gateway_error(error: &GatewayError) -> Reply {
    let text = match error {
        GatewayError::Unauthorized => {
            "🔒 Your session is no longer valid. Send /start to sign in again.".to_string()
        }
        GatewayError::Forbidden(_) => return no_permission(),
        GatewayError::NotFound(_) => "❌ Not found.".to_string(),
        GatewayError::Invalid { code, message } => match code.as_str() {
            "invalid_transition" => "⚠ That status change isn't allowed for this order.".to_string(),
            "invalid_status" => "⚠ Unknown order status.".to_string(),
            _ => format!("⚠ {message}"),
        },
        GatewayError::Conflict(message) => format!("⚠ {message}. Please try again."),
        GatewayError::Server(_) | GatewayError::Unavailable(_) | GatewayError::Decode(_) => {
            "🌧 The shop is unavailable right now. Please try again in a moment.".to_string()
        }
    };
    Reply::text(text)
}
