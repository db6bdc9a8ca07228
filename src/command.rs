//! Command parsing
//!
//! One line of text becomes one typed command: a verb plus positional string
//! arguments. The parser only recognizes the verb; argument count and shape
//! are validated per verb by the dispatcher.

use std::str::FromStr;

use crate::error::WalletError;

/// The nine fixed protocol verbs. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandVerb {
    Register,
    Login,
    DepositMoney,
    ListOfferings,
    Buy,
    Sell,
    WalletSummary,
    WalletOverallSummary,
    Disconnect,
}

impl FromStr for CommandVerb {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(CommandVerb::Register),
            "login" => Ok(CommandVerb::Login),
            "deposit_money" => Ok(CommandVerb::DepositMoney),
            "list_offerings" => Ok(CommandVerb::ListOfferings),
            "buy" => Ok(CommandVerb::Buy),
            "sell" => Ok(CommandVerb::Sell),
            "get_wallet_summary" => Ok(CommandVerb::WalletSummary),
            "get_wallet_overall_summary" => Ok(CommandVerb::WalletOverallSummary),
            "disconnect" => Ok(CommandVerb::Disconnect),
            _ => Err(WalletError::UnknownCommand),
        }
    }
}

/// A parsed command line: verb plus order-significant arguments.
#[derive(Debug, Clone)]
pub struct Command {
    pub verb: CommandVerb,
    pub args: Vec<String>,
}

impl Command {
    /// Parse one protocol line. Fails with `UnknownCommand` when the first
    /// token is not a known verb (or the line is blank).
    pub fn parse(line: &str) -> Result<Command, WalletError> {
        let mut tokens = line.split_whitespace();
        let verb = tokens
            .next()
            .ok_or(WalletError::UnknownCommand)?
            .parse::<CommandVerb>()?;

        Ok(Command {
            verb,
            args: tokens.map(str::to_string).collect(),
        })
    }
}
