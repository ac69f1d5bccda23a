//! Parsing of slash commands and button callback payloads.
//!
//! Callback payloads are untrusted input. Anything that does not parse is
//! rejected here, before the dispatcher talks to the gateway.

use petal_core::{OrderId, ProductId, StatusAction, UserId};

/// A slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`: greet, or begin registration.
    Start,
    /// `/link <user_id>`: attach this chat to an existing account.
    Link(UserId),
    /// `/orders`: list orders.
    Orders,
    /// `/order <id>`: show one order.
    Order(OrderId),
    /// `/neworder <product_id>...`: place an order.
    NewOrder(Vec<ProductId>),
    /// `/products`: show the catalog.
    Products,
    /// `/analytics`: latest sales report.
    Analytics,
    /// `/cancel`: abandon the current flow.
    Cancel,
    /// `/help`
    Help,
}

/// Why a command could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Not a command the bot knows.
    Unknown(String),
    /// Known command with bad arguments; carries the usage line.
    Usage(&'static str),
}

impl Command {
    /// Parse a message starting with `/`. Returns `None` for plain text.
    ///
    /// A `@botname` suffix on the command is ignored.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` for unknown commands or malformed arguments.
    pub fn parse(text: &str) -> Option<Result<Self, CommandError>> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let mut words = rest.split_whitespace();
        let head = words.next().unwrap_or_default();
        let name = head.split_once('@').map_or(head, |(name, _)| name);
        let args: Vec<&str> = words.collect();

        Some(Self::from_parts(&name.to_ascii_lowercase(), &args))
    }

    fn from_parts(name: &str, args: &[&str]) -> Result<Self, CommandError> {
        match name {
            "start" => Ok(Self::Start),
            "orders" => Ok(Self::Orders),
            "products" => Ok(Self::Products),
            "analytics" => Ok(Self::Analytics),
            "cancel" => Ok(Self::Cancel),
            "help" => Ok(Self::Help),
            "link" => match args {
                [id] => id
                    .parse()
                    .map(Self::Link)
                    .map_err(|_| CommandError::Usage("/link <user id>")),
                _ => Err(CommandError::Usage("/link <user id>")),
            },
            "order" => match args {
                [id] => id
                    .parse()
                    .map(Self::Order)
                    .map_err(|_| CommandError::Usage("/order <order id>")),
                _ => Err(CommandError::Usage("/order <order id>")),
            },
            "neworder" => {
                let usage = CommandError::Usage("/neworder <product id> [product id...]");
                if args.is_empty() {
                    return Err(usage);
                }
                // Commas are accepted as separators too: `/neworder 1,2`.
                args.iter()
                    .flat_map(|arg| arg.split(','))
                    .filter(|id| !id.is_empty())
                    .map(|id| id.parse::<ProductId>())
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::NewOrder)
                    .map_err(|_| usage)
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// A button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    /// List orders.
    Orders,
    /// Latest sales report.
    Analytics,
    /// Re-run the last listing (same as `Orders`).
    Refresh,
    /// Deliver the pending order to the saved address.
    UseSavedAddress,
    /// Type a new address for the pending order.
    NewAddress,
    /// Show one order.
    ShowOrder(OrderId),
    /// Move an order to the action's target status.
    Status(StatusAction, OrderId),
}

impl Callback {
    pub const ORDERS: &'static str = "orders";
    pub const ANALYTICS: &'static str = "analytics";
    pub const REFRESH: &'static str = "refresh";
    pub const USE_SAVED_ADDRESS: &'static str = "use_saved_address";
    pub const NEW_ADDRESS: &'static str = "new_address";

    /// Parse callback data.
    ///
    /// Payloads with an id have the form `<action>_<digits>`, e.g.
    /// `confirm_17`, `in_delivery_17` or `order_17`. The action may itself
    /// contain underscores; the id may not.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            Self::ORDERS => return Some(Self::Orders),
            Self::ANALYTICS => return Some(Self::Analytics),
            Self::REFRESH => return Some(Self::Refresh),
            Self::USE_SAVED_ADDRESS => return Some(Self::UseSavedAddress),
            Self::NEW_ADDRESS => return Some(Self::NewAddress),
            _ => {}
        }

        let (action, id) = data.rsplit_once('_')?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let id = OrderId::new(id.parse().ok()?);

        if action == "order" {
            return Some(Self::ShowOrder(id));
        }
        action
            .parse::<StatusAction>()
            .ok()
            .map(|action| Self::Status(action, id))
    }

    /// Encode a status button payload.
    #[must_use]
    pub fn status_data(action: StatusAction, id: OrderId) -> String {
        format!("{}_{id}", action.as_str())
    }

    /// Encode an order button payload.
    #[must_use]
    pub fn order_data(id: OrderId) -> String {
        format!("order_{id}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(Command::parse("hello"), None);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start"), Some(Ok(Command::Start)));
        assert_eq!(Command::parse("/orders@petal_bot"), Some(Ok(Command::Orders)));
        assert_eq!(
            Command::parse("/order 17"),
            Some(Ok(Command::Order(OrderId::new(17))))
        );
        assert_eq!(
            Command::parse("/link 5"),
            Some(Ok(Command::Link(UserId::new(5))))
        );
        assert_eq!(
            Command::parse("/neworder 1 2,3"),
            Some(Ok(Command::NewOrder(vec![
                ProductId::new(1),
                ProductId::new(2),
                ProductId::new(3)
            ])))
        );
    }

    #[test]
    fn test_command_usage_errors() {
        assert!(matches!(
            Command::parse("/order"),
            Some(Err(CommandError::Usage(_)))
        ));
        assert!(matches!(
            Command::parse("/order abc"),
            Some(Err(CommandError::Usage(_)))
        ));
        assert!(matches!(
            Command::parse("/neworder"),
            Some(Err(CommandError::Usage(_)))
        ));
        assert_eq!(
            Command::parse("/dance"),
            Some(Err(CommandError::Unknown("dance".to_string())))
        );
    }

    #[test]
    fn test_parse_status_callbacks() {
        assert_eq!(
            Callback::parse("confirm_17"),
            Some(Callback::Status(StatusAction::Confirm, OrderId::new(17)))
        );
        assert_eq!(
            Callback::parse("in_delivery_17"),
            Some(Callback::Status(StatusAction::InDelivery, OrderId::new(17)))
        );
        assert_eq!(
            Callback::parse("order_3"),
            Some(Callback::ShowOrder(OrderId::new(3)))
        );
        assert_eq!(Callback::parse("use_saved_address"), Some(Callback::UseSavedAddress));
        assert_eq!(Callback::parse("refresh"), Some(Callback::Refresh));
    }

    #[test]
    fn test_rejects_malformed_callbacks() {
        for data in [
            "confirm_abc",
            "confirm_17_3",
            "confirm_",
            "confirm_-1",
            "confirm_+1",
            "teleport_17",
            "17",
            "",
            "confirm_99999999999",
        ] {
            assert_eq!(Callback::parse(data), None, "{data}");
        }
    }

    #[test]
    fn test_encoded_payloads_parse_back() {
        let id = OrderId::new(42);
        for action in StatusAction::ALL {
            assert_eq!(
                Callback::parse(&Callback::status_data(action, id)),
                Some(Callback::Status(action, id))
            );
        }
        assert_eq!(
            Callback::parse(&Callback::order_data(id)),
            Some(Callback::ShowOrder(id))
        );
    }
}
