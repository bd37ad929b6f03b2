//! Command implementations. Each one logs in, does its work, and logs out.
//!
//! Output goes to the supplied writer so the commands can be driven from
//! tests over a mock transport.

use std::io::Write;
use std::str::FromStr;

use chrono::NaiveDate;
use log::{info, warn};
use rust_decimal::Decimal;
use tachibana::api::{CancelOrderRequest, NewOrderRequest, OrderExpiry, OrderListFilter};
use tachibana::stream::EventKind;
use tachibana::{
    CancelToken, Client, EventType, ExecutionDate, ExecutionTiming, Market, OrderKey, OrderPrice,
    OrderSnapshot, Session, Side, StopKind, StopOrder, StreamEvent, Subscription, TrackOutcome,
    TradeType, Tracker, WireCode,
};

use crate::config::Config;
use crate::error::{Error, Result};

/// Log in, run `f` with the session, and log out whatever `f` returned.
pub fn with_session<T>(
    client: &Client,
    config: &Config,
    f: impl FnOnce(&Session) -> Result<T>,
) -> Result<T> {
    let login = client.login(&config.credentials()?)?;
    if !login.status.is_success() {
        return Err(Error::Rejected(login.status));
    }
    let session = login.into_session()?;

    let result = f(&session);

    if !session.is_closed() {
        match client.logout(&session) {
            Ok(resp) if !resp.status.is_success() => warn!("Logout rejected: {}", resp.status),
            Ok(_) => {}
            Err(e) => warn!("Logout failed: {e}"),
        }
    }
    result
}

pub fn login_check(client: &Client, config: &Config, out: &mut dyn Write) -> Result<()> {
    let login = client.login(&config.credentials()?)?;
    if !login.status.is_success() {
        return Err(Error::Rejected(login.status));
    }
    let unread = login.unread_document;
    let session = login.into_session()?;
    writeln!(
        out,
        "login ok: {} (unread documents: {})",
        session.user_id(),
        if unread { "yes" } else { "no" }
    )?;
    client.logout(&session)?;
    Ok(())
}

pub fn list_orders(
    client: &Client,
    config: &Config,
    filter: &OrderListFilter,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    with_session(client, config, |session| {
        let list = client.order_list(session, filter)?;
        if !list.status.is_success() {
            return Err(Error::Rejected(list.status));
        }
        if list.orders.is_empty() && !json {
            writeln!(out, "no orders")?;
        }
        for order in &list.orders {
            if json {
                writeln!(out, "{}", serde_json::to_string(order)?)?;
            } else {
                writeln!(out, "{}", order_line(order))?;
            }
        }
        Ok(())
    })
}

pub fn show_detail(
    client: &Client,
    config: &Config,
    key: &OrderKey,
    out: &mut dyn Write,
) -> Result<()> {
    with_session(client, config, |session| {
        let detail = client.order_list_detail(session, key)?;
        if !detail.status.is_success() {
            return Err(Error::Rejected(detail.status));
        }
        writeln!(
            out,
            "{key} {} {}/{} {} {}",
            detail.issue_code.as_deref().unwrap_or("-"),
            detail.contracted_quantity.unwrap_or_default(),
            detail.requested_quantity.unwrap_or_default(),
            code_or_dash(detail.order_status),
            code_or_dash(detail.contract_status),
        )?;
        for (i, fill) in detail.contracts.iter().enumerate() {
            let at = fill
                .executed_at
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".into());
            writeln!(out, "  #{} {} @ {} ({at})", i + 1, fill.quantity, fill.price)?;
        }
        Ok(())
    })
}

pub fn cancel(client: &Client, config: &Config, key: &OrderKey, out: &mut dyn Write) -> Result<()> {
    let pin = config.second_password()?;
    with_session(client, config, |session| {
        let resp = client.cancel_order(session, &CancelOrderRequest::new(key.clone(), pin))?;
        if !resp.status.is_success() {
            return Err(Error::Rejected(resp.status));
        }
        writeln!(out, "cancel accepted: {key}")?;
        Ok(())
    })
}

/// Everything needed to build an order from the command line.
#[derive(Debug, Clone)]
pub struct OrderArgs {
    pub issue_code: String,
    pub side: Side,
    pub quantity: u64,
    pub price: OrderPrice,
    pub market: Market,
    pub timing: ExecutionTiming,
    pub trade_type: TradeType,
    pub expiry: OrderExpiry,
    pub stop: Option<StopOrder>,
}

impl OrderArgs {
    fn describe(&self) -> String {
        let price = match self.price {
            OrderPrice::Market => "market".to_string(),
            OrderPrice::Limit(p) => p.to_string(),
        };
        let mut text = format!(
            "{} {} x{} @ {price} on {} ({}, {})",
            self.side, self.issue_code, self.quantity, self.market, self.trade_type, self.timing
        );
        if let Some(stop) = self.stop {
            text.push_str(&format!(", {:?} trigger {}", stop.kind, stop.trigger_price));
        }
        text
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceOptions {
    /// Skip the confirmation prompt.
    pub yes: bool,
    /// Track the order after acceptance.
    pub track: bool,
}

pub fn place(
    client: &Client,
    config: &Config,
    args: &OrderArgs,
    opts: PlaceOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let pin = config.second_password()?;
    let mut order = NewOrderRequest::cash(
        args.issue_code.clone(),
        args.side,
        args.price,
        args.quantity,
        pin,
    )
    .with_market(args.market)
    .with_timing(args.timing)
    .with_trade_type(args.trade_type)
    .with_expiry(args.expiry);
    if let Some(stop) = args.stop {
        order = order.with_stop(stop);
    }

    writeln!(out, "{}", args.describe())?;
    if !opts.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Send order?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
        if !confirmed {
            return Err(Error::Aborted("order not sent".into()));
        }
    }

    with_session(client, config, |session| {
        let resp = client.new_order(session, &order)?;
        if !resp.status.is_success() {
            return Err(Error::Rejected(resp.status));
        }
        let key = resp.order_key()?;
        writeln!(out, "order accepted: {key}")?;
        if let Some(amount) = resp.settlement_amount {
            writeln!(out, "estimated settlement: {amount}")?;
        }

        if opts.track {
            track(client, config, session, key, Some(args.issue_code.as_str()), out)?;
        }
        Ok(())
    })
}

pub fn watch(
    client: &Client,
    config: &Config,
    key: OrderKey,
    issue_code: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    with_session(client, config, |session| {
        track(client, config, session, key, issue_code, out)
    })
}

fn track(
    client: &Client,
    config: &Config,
    session: &Session,
    key: OrderKey,
    issue_code: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let mut tracker = Tracker::new(client, session, key)
        .interval(config.poll_interval())
        .max_polls(config.tracker.max_polls)
        .missing_tolerance(config.tracker.missing_tolerance);
    if let Some(issue) = issue_code {
        tracker = tracker.issue_code(issue);
    }

    // Write failures inside the callback are reported after tracking ends.
    let mut write_error = None;
    let outcome = tracker.run(&CancelToken::new(), |order| {
        if let Err(e) = writeln!(out, "{}", order_line(order)) {
            write_error.get_or_insert(e);
        }
    })?;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    match outcome {
        TrackOutcome::Completed(order) => writeln!(out, "done: {}", order_line(&order))?,
        TrackOutcome::Cancelled { .. } => writeln!(out, "tracking cancelled")?,
        TrackOutcome::Vanished { last_seen } => {
            warn!("Order vanished from the order list");
            writeln!(out, "order vanished (last seen: {})", seen(&last_seen))?;
        }
        TrackOutcome::Abandoned { last_seen } => {
            writeln!(out, "gave up polling (last seen: {})", seen(&last_seen))?;
        }
    }
    Ok(())
}

pub fn stream(
    client: &Client,
    config: &Config,
    subscription: &Subscription,
    limit: Option<usize>,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    with_session(client, config, |session| {
        let mut events = client.stream(session, subscription)?;
        let mut delivered = 0usize;
        for item in events.iter() {
            let event = item?;
            if json {
                writeln!(out, "{}", serde_json::to_string(&event)?)?;
            } else {
                writeln!(out, "{}", event_line(&event))?;
            }
            delivered += 1;
            if limit.is_some_and(|n| delivered >= n) {
                break;
            }
        }
        info!("Stream finished after {delivered} events");
        Ok(())
    })
}

pub fn order_line(order: &OrderSnapshot) -> String {
    let price = match order.order_price {
        Some(p) if p.is_zero() => "market".to_string(),
        Some(p) => p.to_string(),
        None => "-".to_string(),
    };
    format!(
        "{} {} {} {}/{} @ {price} {} {}",
        order.key,
        order.issue_code,
        order.side,
        order.contracted_quantity,
        order.requested_quantity,
        order.order_status,
        order.contract_status,
    )
}

fn event_line(event: &StreamEvent) -> String {
    let body = match &event.kind {
        EventKind::Quote(q) => q
            .values
            .iter()
            .map(|v| format!("{}:{}={}", v.row, v.column, v.value))
            .collect::<Vec<_>>()
            .join(" "),
        EventKind::Execution(n) => format!(
            "{} notice {} {}",
            n.key,
            n.notice_type,
            n.executed_quantity
                .map(|q| format!("x{q}"))
                .unwrap_or_default()
        ),
        EventKind::News(n) => format!("{} {}", n.id, n.headline),
        EventKind::System(m) => m
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" "),
    };
    format!("#{} {} {body}", event.sequence, event.event_type().as_code())
}

fn seen(last: &Option<OrderSnapshot>) -> String {
    last.as_ref().map(order_line).unwrap_or_else(|| "never".into())
}

fn code_or_dash<C: WireCode + std::fmt::Display>(code: Option<C>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "-".into())
}

// ============================================================================
// Argument parsing
// ============================================================================

/// `market` or a decimal limit price.
pub fn parse_price(raw: &str) -> Result<OrderPrice> {
    if raw.eq_ignore_ascii_case("market") {
        return Ok(OrderPrice::Market);
    }
    let price = Decimal::from_str(raw)
        .map_err(|_| Error::Argument(format!("bad price {raw:?}")))?;
    if price <= Decimal::ZERO {
        return Err(Error::Argument(format!("price must be > 0, got {raw}")));
    }
    Ok(OrderPrice::Limit(price))
}

/// `YYYYMMDD` business day.
pub fn parse_date(raw: &str) -> Result<ExecutionDate> {
    ExecutionDate::parse(raw).ok_or_else(|| Error::Argument(format!("bad date {raw:?}, expected YYYYMMDD")))
}

/// `YYYYMMDD` expiry date, or `today`.
pub fn parse_expiry(raw: &str) -> Result<OrderExpiry> {
    if raw.eq_ignore_ascii_case("today") {
        return Ok(OrderExpiry::Today);
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(OrderExpiry::Until)
        .map_err(|_| Error::Argument(format!("bad expiry {raw:?}, expected today or YYYYMMDD")))
}

/// A wire code such as `00` for a market or `EC` for an event type.
pub fn parse_code<C: WireCode>(raw: &str, what: &str) -> Result<C> {
    C::from_code(raw).ok_or_else(|| {
        let known: Vec<&str> = C::ALL.iter().map(|c| c.as_code()).collect();
        Error::Argument(format!("unknown {what} {raw:?} (one of {})", known.join(", ")))
    })
}

/// Stop leg from `--trigger` and optional `--stop-price`.
pub fn parse_stop(trigger: Option<&str>, price: Option<&str>, oco: bool) -> Result<Option<StopOrder>> {
    let Some(trigger) = trigger else {
        if price.is_some() {
            return Err(Error::Argument("--stop-price needs --trigger".into()));
        }
        return Ok(None);
    };
    let trigger_price = Decimal::from_str(trigger)
        .map_err(|_| Error::Argument(format!("bad trigger price {trigger:?}")))?;
    let price = match price {
        Some(p) => parse_price(p)?,
        None => OrderPrice::Market,
    };
    Ok(Some(StopOrder {
        kind: if oco { StopKind::Oco } else { StopKind::Stop },
        trigger_price,
        price,
    }))
}

pub fn parse_event_types(raw: &[String]) -> Result<Vec<EventType>> {
    raw.iter().map(|r| parse_code(r, "event type")).collect()
}

pub fn order_key(number: &str, date: &str) -> Result<OrderKey> {
    Ok(OrderKey::new(number, parse_date(date)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price("market").unwrap(), OrderPrice::Market);
        assert_eq!(parse_price("4000.5").unwrap(), OrderPrice::Limit(Decimal::new(40005, 1)));
        assert!(parse_price("0").is_err());
        assert!(parse_price("cheap").is_err());
    }

    #[test]
    fn expiry_parsing() {
        assert_eq!(parse_expiry("today").unwrap(), OrderExpiry::Today);
        assert!(matches!(parse_expiry("20240320").unwrap(), OrderExpiry::Until(_)));
        assert!(parse_expiry("2024-03-20").is_err());
    }

    #[test]
    fn code_parsing_lists_known_codes() {
        assert_eq!(parse_code::<Market>("00", "market").unwrap(), Market::Tokyo);
        let err = parse_code::<Market>("99", "market").unwrap_err();
        assert!(err.to_string().contains("00"));
    }

    #[test]
    fn stop_parsing() {
        assert_eq!(parse_stop(None, None, false).unwrap(), None);
        assert!(parse_stop(None, Some("100"), false).is_err());
        let stop = parse_stop(Some("3900"), None, true).unwrap().unwrap();
        assert_eq!(stop.kind, StopKind::Oco);
        assert_eq!(stop.price, OrderPrice::Market);
    }
}
