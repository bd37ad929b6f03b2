//! Closed enumerations used on the wire, with their protocol codes.
//!
//! Every enum maps one-to-one onto a code string. `from_code(x.as_code())`
//! returns `x` for every variant, so nothing is lost between a request and
//! the responses or stream notices that echo it back.

use std::fmt;

/// An enumerated protocol field.
pub trait WireCode: Sized + Copy + 'static {
    /// Every variant, in declaration order.
    const ALL: &'static [Self];

    /// The code sent on the wire.
    fn as_code(self) -> &'static str;

    /// Parse a wire code. Unknown codes return `None`.
    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_code() == code)
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl WireCode for $name {
            const ALL: &'static [Self] = &[$( $name::$variant, )+];

            fn as_code(self) -> &'static str {
                match self {
                    $( $name::$variant => $code, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

wire_enum! {
    /// Tax classification of the account an order settles into (`sZyoutoekiKazeiC`).
    pub enum AccountType {
        General = "1",
        Specific = "3",
        Nisa = "5",
        NisaGrowth = "6",
    }
}

wire_enum! {
    /// Exchange the issue is traded on (`sSizyouC`).
    pub enum Market {
        Tokyo = "00",
        Nagoya = "02",
        Fukuoka = "05",
        Sapporo = "07",
    }
}

wire_enum! {
    /// Order side (`sBaibaiKubun`). Delivery and receipt settle margin positions in kind.
    pub enum Side {
        Sell = "1",
        Buy = "3",
        Delivery = "5",
        Receipt = "7",
    }
}

wire_enum! {
    /// Execution timing condition (`sCondition`).
    pub enum ExecutionTiming {
        /// No session constraint.
        Anytime = "0",
        AtOpen = "2",
        AtClose = "4",
        /// Limit order that turns into a market order at the close if still open.
        LimitThenMarketAtClose = "6",
    }
}

wire_enum! {
    /// Cash or margin classification (`sGenkinShinyouKubun`).
    pub enum TradeType {
        Cash = "0",
        MarginOpenStandard = "2",
        MarginCloseStandard = "4",
        MarginOpenGeneral = "6",
        MarginCloseGeneral = "8",
    }
}

wire_enum! {
    /// Stop-order kind (`sGyakusasiOrderType`).
    pub enum StopOrderType {
        Normal = "0",
        Stop = "1",
        /// Normal order paired with a stop leg (one-cancels-other).
        Oco = "2",
    }
}

wire_enum! {
    /// How margin positions to close are chosen (`sTatebiType`).
    pub enum ExitPositionType {
        NotApplicable = "*",
        /// Positions listed explicitly on the order.
        Specified = "1",
        OldestFirst = "2",
        ProfitableFirst = "3",
        UnprofitableFirst = "4",
    }
}

wire_enum! {
    /// Order status (`sOrderStatusCode`).
    pub enum OrderStatus {
        Pending = "0",
        Open = "1",
        AcceptError = "2",
        Amending = "3",
        Amended = "4",
        AmendFailed = "5",
        Cancelling = "6",
        Cancelled = "7",
        CancelFailed = "8",
        PartiallyFilled = "9",
        Filled = "10",
        PartiallyExpired = "11",
        Expired = "12",
        WaitingToSend = "13",
        Invalid = "14",
    }
}

impl OrderStatus {
    /// The order can no longer trade.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            OrderStatus::AcceptError
                | OrderStatus::Cancelled
                | OrderStatus::Filled
                | OrderStatus::PartiallyExpired
                | OrderStatus::Expired
                | OrderStatus::Invalid
        )
    }
}

wire_enum! {
    /// Contract (fill) progress of an order (`sOrderYakuzyouStatus`).
    pub enum ContractStatus {
        Pending = "0",
        Partial = "1",
        Done = "2",
    }
}

wire_enum! {
    /// Order inquiry filter for the order list (`sOrderSyoukaiStatus`).
    pub enum InquiryStatus {
        All = "",
        Unfilled = "1",
        PartiallyFilled = "2",
        Filled = "3",
        Cancellable = "4",
        Finished = "5",
    }
}

wire_enum! {
    /// Event-stream command (`p_cmd` / `p_evt_cmd`).
    pub enum EventType {
        /// Stream status or error report.
        Status = "ST",
        KeepAlive = "KP",
        /// Quote feed.
        Feed = "FD",
        /// Order and execution notice.
        Execution = "EC",
        News = "NS",
        SystemStatus = "SS",
        OperationStatus = "US",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_round_trip<T: WireCode + PartialEq + fmt::Debug>() {
        for &v in T::ALL {
            assert_eq!(T::from_code(v.as_code()), Some(v));
        }
    }

    #[test]
    fn every_enum_round_trips() {
        assert_round_trip::<AccountType>();
        assert_round_trip::<Market>();
        assert_round_trip::<Side>();
        assert_round_trip::<ExecutionTiming>();
        assert_round_trip::<TradeType>();
        assert_round_trip::<StopOrderType>();
        assert_round_trip::<ExitPositionType>();
        assert_round_trip::<OrderStatus>();
        assert_round_trip::<ContractStatus>();
        assert_round_trip::<InquiryStatus>();
        assert_round_trip::<EventType>();
    }

    #[test]
    fn codes_are_unique() {
        let codes: Vec<_> = OrderStatus::ALL.iter().map(|s| s.as_code()).collect();
        let mut dedup = codes.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(codes.len(), dedup.len());
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(Side::from_code("2"), None);
        assert_eq!(Market::from_code("0"), None);
        assert_eq!(EventType::from_code("fd"), None);
    }

    #[test]
    fn final_statuses() {
        assert!(OrderStatus::Filled.is_final());
        assert!(OrderStatus::Cancelled.is_final());
        assert!(!OrderStatus::Open.is_final());
        assert!(!OrderStatus::Cancelling.is_final());
    }

    proptest! {
        #[test]
        fn from_code_never_misreads(code in "[0-9A-Z*]{0,3}") {
            if let Some(status) = OrderStatus::from_code(&code) {
                prop_assert_eq!(status.as_code(), code.as_str());
            }
            if let Some(side) = Side::from_code(&code) {
                prop_assert_eq!(side.as_code(), code.as_str());
            }
        }
    }
}
