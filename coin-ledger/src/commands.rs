//! Typed commands for the chat dispatcher
//!
//! The dispatcher resolves who is calling and whether they hold the
//! platform administrator capability; everything else arrives here as raw
//! tokens. [`Command::parse`] validates those tokens into typed requests
//! before anything touches the ledger, and [`dispatch`] routes a command
//! to the [`Ledger`].

use crate::{
    accounts::{AdminOutcome, TransferReceipt},
    error::{Error, Result},
    ranking::RankEntry,
    settings::{validate_fee_rate, PlatformRole},
    types::AccountId,
    wager::{DrawResult, Parity, WagerOutcome},
    Ledger,
};
use std::fmt;
use std::str::FromStr;

/// Strictly positive coin amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount(u64);

impl Amount {
    /// Wrap a positive amount
    pub fn new(value: u64) -> Result<Self> {
        if value == 0 {
            return Err(Error::NonPositiveAmount);
        }
        Ok(Self(value))
    }

    /// Coins
    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: i128 = s
            .trim()
            .replace(',', "")
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("not a whole number: {}", s)))?;
        if value <= 0 {
            return Err(Error::NonPositiveAmount);
        }
        let value = u64::try_from(value)
            .map_err(|_| Error::InvalidArgument(format!("amount too large: {}", s)))?;
        Self::new(value)
    }
}

/// Fee rate already checked to lie in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRate(f64);

impl FeeRate {
    /// Validate a rate
    pub fn new(rate: f64) -> Result<Self> {
        validate_fee_rate(rate)?;
        Ok(Self(rate))
    }

    /// Rate as a fraction
    pub fn get(self) -> f64 {
        self.0
    }
}

impl FromStr for FeeRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rate: f64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("not a number: {}", s)))?;
        Self::new(rate)
    }
}

/// A dispatcher command with validated arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Caller's balance
    Balance,
    /// Transfer to `target`
    Give {
        /// Receiver
        target: AccountId,
        /// Coins
        amount: Amount,
    },
    /// Dice duel against `target`
    DiceDuel {
        /// Opponent
        target: AccountId,
        /// Stake
        amount: Amount,
    },
    /// Odd/even against `target`
    OddEven {
        /// Opponent
        target: AccountId,
        /// Stake
        amount: Amount,
        /// Caller's call
        call: Parity,
    },
    /// Weighted draw (ledger admin)
    Draw,
    /// Top accounts
    Leaderboard,
    /// Add a ledger admin (platform administrator)
    AddAdmin {
        /// New admin
        target: AccountId,
    },
    /// Mint coins (ledger admin)
    Grant {
        /// Receiver
        target: AccountId,
        /// Coins
        amount: Amount,
    },
    /// Set fee rate (ledger admin)
    SetFee {
        /// New rate
        rate: FeeRate,
    },
    /// Static command listing
    Help,
}

/// One line of the help listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpEntry {
    /// Usage
    pub usage: &'static str,
    /// Effect
    pub summary: &'static str,
    /// Needs a privilege tier
    pub privileged: bool,
}

/// Every command, in display order
pub const HELP: &[HelpEntry] = &[
    HelpEntry {
        usage: "balance",
        summary: "show your coins",
        privileged: false,
    },
    HelpEntry {
        usage: "give @user amount",
        summary: "give coins to another user",
        privileged: false,
    },
    HelpEntry {
        usage: "dice-duel @user amount",
        summary: "dice duel (1-100), higher roll wins",
        privileged: false,
    },
    HelpEntry {
        usage: "odd-even @user amount odd|even",
        summary: "call the parity of two rolls",
        privileged: false,
    },
    HelpEntry {
        usage: "leaderboard",
        summary: "top accounts by coins",
        privileged: false,
    },
    HelpEntry {
        usage: "draw",
        summary: "weighted draw (50-300)",
        privileged: true,
    },
    HelpEntry {
        usage: "add-admin @user",
        summary: "add a ledger admin",
        privileged: true,
    },
    HelpEntry {
        usage: "grant @user amount",
        summary: "mint coins",
        privileged: true,
    },
    HelpEntry {
        usage: "set-fee rate",
        summary: "set the wager fee (e.g. 0.05 = 5%)",
        privileged: true,
    },
    HelpEntry {
        usage: "help",
        summary: "this listing",
        privileged: false,
    },
];

impl Command {
    /// Parse a command name and its argument tokens
    pub fn parse(name: &str, args: &[&str]) -> Result<Self> {
        let name = name.trim_start_matches('/');
        let command = match name {
            "balance" | "잔액" => {
                expect_args(name, args, 0)?;
                Command::Balance
            }
            "give" | "지급" => {
                expect_args(name, args, 2)?;
                Command::Give {
                    target: parse_target(args[0])?,
                    amount: args[1].parse()?,
                }
            }
            "dice-duel" | "주사위대결" => {
                expect_args(name, args, 2)?;
                Command::DiceDuel {
                    target: parse_target(args[0])?,
                    amount: args[1].parse()?,
                }
            }
            "odd-even" | "홀짝" => {
                expect_args(name, args, 3)?;
                Command::OddEven {
                    target: parse_target(args[0])?,
                    amount: args[1].parse()?,
                    call: args[2].parse()?,
                }
            }
            "draw" | "뽑기" => {
                expect_args(name, args, 0)?;
                Command::Draw
            }
            "leaderboard" | "랭킹" => {
                expect_args(name, args, 0)?;
                Command::Leaderboard
            }
            "add-admin" | "관리자추가" => {
                expect_args(name, args, 1)?;
                Command::AddAdmin {
                    target: parse_target(args[0])?,
                }
            }
            "grant" | "코인추가" => {
                expect_args(name, args, 2)?;
                Command::Grant {
                    target: parse_target(args[0])?,
                    amount: args[1].parse()?,
                }
            }
            "set-fee" | "수수료설정" => {
                expect_args(name, args, 1)?;
                Command::SetFee {
                    rate: args[0].parse()?,
                }
            }
            "help" | "도움말" => {
                expect_args(name, args, 0)?;
                Command::Help
            }
            other => {
                return Err(Error::InvalidArgument(format!("unknown command: {}", other)));
            }
        };
        Ok(command)
    }

    /// Parse a whitespace-separated line, command name first
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| Error::InvalidArgument("empty command".to_string()))?;
        let args: Vec<&str> = tokens.collect();
        Self::parse(name, &args)
    }
}

fn expect_args(name: &str, args: &[&str], count: usize) -> Result<()> {
    if args.len() != count {
        return Err(Error::InvalidArgument(format!(
            "{} takes {} argument(s), got {}",
            name,
            count,
            args.len()
        )));
    }
    Ok(())
}

/// Accept a bare id or a mention such as `<@123>` / `<@!123>` / `@name`
fn parse_target(token: &str) -> Result<AccountId> {
    let id = token
        .trim()
        .trim_start_matches("<@")
        .trim_start_matches('!')
        .trim_end_matches('>')
        .trim_start_matches('@');
    if id.is_empty() {
        return Err(Error::InvalidArgument(format!("not a user: {}", token)));
    }
    Ok(AccountId::new(id))
}

/// What a command produced
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Caller's balance
    Balance {
        /// Caller
        account: AccountId,
        /// Coins
        balance: u64,
    },
    /// Completed transfer
    Transferred(TransferReceipt),
    /// Wager result
    Wager(WagerOutcome),
    /// Draw result
    Draw(DrawResult),
    /// Leaderboard rows; empty when nobody has an account yet
    Leaderboard(Vec<RankEntry>),
    /// Admin list change
    Admin {
        /// Target
        target: AccountId,
        /// Added or already present
        outcome: AdminOutcome,
    },
    /// Coins minted
    Granted {
        /// Receiver
        target: AccountId,
        /// Coins minted
        amount: u64,
        /// Receiver balance afterwards
        balance: u64,
    },
    /// Fee rate changed
    FeeSet {
        /// Rate before
        previous: f64,
        /// Rate now
        rate: f64,
    },
    /// Help listing
    Help(&'static [HelpEntry]),
}

/// Run `command` for `caller`
pub async fn dispatch(
    ledger: &Ledger,
    caller: &AccountId,
    role: PlatformRole,
    command: Command,
) -> Result<Reply> {
    tracing::debug!(caller = %caller, ?command, "Dispatching command");

    let reply = match command {
        Command::Balance => Reply::Balance {
            account: caller.clone(),
            balance: ledger.balance(caller.clone()).await?,
        },
        Command::Give { target, amount } => {
            Reply::Transferred(ledger.give(caller.clone(), target, amount.get()).await?)
        }
        Command::DiceDuel { target, amount } => {
            Reply::Wager(ledger.dice_duel(caller.clone(), target, amount.get()).await?)
        }
        Command::OddEven {
            target,
            amount,
            call,
        } => Reply::Wager(
            ledger
                .odd_even(caller.clone(), target, amount.get(), call)
                .await?,
        ),
        Command::Draw => Reply::Draw(ledger.draw(caller.clone()).await?),
        Command::Leaderboard => Reply::Leaderboard(ledger.leaderboard()?),
        Command::AddAdmin { target } => {
            let outcome = ledger.add_admin(caller.clone(), role, target.clone()).await?;
            Reply::Admin { target, outcome }
        }
        Command::Grant { target, amount } => {
            let balance = ledger
                .grant(caller.clone(), target.clone(), amount.get())
                .await?;
            Reply::Granted {
                target,
                amount: amount.get(),
                balance,
            }
        }
        Command::SetFee { rate } => {
            let previous = ledger.set_fee_rate(caller.clone(), rate.get()).await?;
            Reply::FeeSet {
                previous,
                rate: rate.get(),
            }
        }
        Command::Help => Reply::Help(HELP),
    };
    Ok(reply)
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Balance { account, balance } => write!(f, "{} has {} coins", account, balance),
            Reply::Transferred(r) => write!(
                f,
                "{} gave {} coins to {} ({} left, {} now has {})",
                r.from, r.amount, r.to, r.from_balance, r.to, r.to_balance
            ),
            Reply::Wager(WagerOutcome::Tied {
                initiator_roll,
                opponent_roll,
            }) => write!(
                f,
                "Tie {} - {}, stakes returned",
                initiator_roll, opponent_roll
            ),
            Reply::Wager(WagerOutcome::Settled(s)) => write!(
                f,
                "Rolls {} - {}: {} wins {} coins (fee {}), {} loses {}",
                s.initiator_roll,
                s.opponent_roll,
                s.winner,
                s.quote.prize,
                s.quote.fee,
                s.loser,
                s.quote.stake
            ),
            Reply::Draw(d) => write!(f, "Drew {} ({})", d.multiplier, d.tier),
            Reply::Leaderboard(rows) if rows.is_empty() => write!(f, "No accounts yet"),
            Reply::Leaderboard(rows) => {
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}. {} - {} coins", row.rank, row.account, row.balance)?;
                }
                Ok(())
            }
            Reply::Admin {
                target,
                outcome: AdminOutcome::Added,
            } => write!(f, "{} is now an admin", target),
            Reply::Admin {
                target,
                outcome: AdminOutcome::AlreadyAdmin,
            } => write!(f, "{} is already an admin", target),
            Reply::Granted {
                target,
                amount,
                balance,
            } => write!(f, "Granted {} coins to {} (now {})", amount, target, balance),
            Reply::FeeSet { rate, .. } => write!(f, "Wager fee set to {}%", rate * 100.0),
            Reply::Help(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    let marker = if entry.privileged { " (admin)" } else { "" };
                    write!(f, "{} - {}{}", entry.usage, entry.summary, marker)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::wager::ScriptedRolls;
    use crate::Config;
    use std::sync::Arc;

    #[test]
    fn test_parse_give() {
        let command = Command::parse_line("give <@!42> 300").unwrap();
        assert_eq!(
            command,
            Command::Give {
                target: AccountId::new("42"),
                amount: Amount::new(300).unwrap(),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_amounts() {
        assert!(matches!(
            Command::parse_line("give 42 0"),
            Err(Error::NonPositiveAmount)
        ));
        assert!(matches!(
            Command::parse_line("dice-duel 42 -5"),
            Err(Error::NonPositiveAmount)
        ));
        assert!(matches!(
            Command::parse_line("give 42 lots"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_odd_even() {
        let command = Command::parse_line("홀짝 7 1,000 짝").unwrap();
        assert_eq!(
            command,
            Command::OddEven {
                target: AccountId::new("7"),
                amount: Amount::new(1000).unwrap(),
                call: Parity::Even,
            }
        );
        assert!(matches!(
            Command::parse_line("odd-even 7 100 maybe"),
            Err(Error::InvalidChoice(_))
        ));
    }

    #[test]
    fn test_parse_set_fee_validates() {
        assert!(matches!(
            Command::parse_line("set-fee 1.5"),
            Err(Error::FeeRateOutOfRange(_))
        ));
        assert_eq!(
            Command::parse_line("/set-fee 0.1").unwrap(),
            Command::SetFee {
                rate: FeeRate::new(0.1).unwrap()
            }
        );
    }

    #[test]
    fn test_parse_arity_and_unknown() {
        assert!(Command::parse_line("balance extra").is_err());
        assert!(Command::parse_line("give 42").is_err());
        assert!(Command::parse_line("steal 42 10").is_err());
        assert!(Command::parse_line("help me").is_err());
        assert_eq!(Command::parse_line("help").unwrap(), Command::Help);
        assert!(Command::parse_line("   ").is_err());
    }

    #[tokio::test]
    async fn test_dispatch_privilege_tiers() {
        let ledger = Ledger::with_store(
            Arc::new(MemoryStore::new()),
            Box::new(ScriptedRolls::default()),
            Config::default(),
        )
        .unwrap();
        let owner = AccountId::new("owner");

        // Platform administrator can add admins but is not one
        let reply = dispatch(
            &ledger,
            &owner,
            PlatformRole::Administrator,
            Command::parse_line("add-admin mod").unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(reply.to_string(), "mod is now an admin");

        let err = dispatch(
            &ledger,
            &owner,
            PlatformRole::Administrator,
            Command::parse_line("grant owner 100").unwrap(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));

        let reply = dispatch(
            &ledger,
            &AccountId::new("mod"),
            PlatformRole::Member,
            Command::parse_line("grant owner 100").unwrap(),
        )
        .await
        .unwrap();
        assert!(matches!(reply, Reply::Granted { balance: 1100, .. }));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_leaderboard_empty() {
        let ledger = Ledger::with_store(
            Arc::new(MemoryStore::new()),
            Box::new(ScriptedRolls::default()),
            Config::default(),
        )
        .unwrap();

        let reply = dispatch(
            &ledger,
            &AccountId::new("a"),
            PlatformRole::Member,
            Command::Leaderboard,
        )
        .await
        .unwrap();
        assert_eq!(reply, Reply::Leaderboard(vec![]));
        assert_eq!(reply.to_string(), "No accounts yet");

        ledger.shutdown().await.unwrap();
    }

    #[test]
    fn test_help_listing() {
        let text = Reply::Help(HELP).to_string();
        assert_eq!(text.lines().count(), HELP.len());
        assert!(text.contains("set-fee rate"));
    }
}
