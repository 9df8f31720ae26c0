//! Command grammar of the batch protocol.

use std::fmt;
use std::str::FromStr;

use crate::application::ApplicationError;
use crate::domain::NodeId;

/// Command keyword as it appears in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Add,
    Remove,
    Move,
    SortId,
    SortName,
    Print,
}

impl Keyword {
    /// Number of integer arguments following the keyword.
    pub fn arity(self) -> usize {
        match self {
            Self::Add | Self::Move => 2,
            Self::Remove | Self::SortId | Self::SortName | Self::Print => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Move => "MOVE",
            Self::SortId => "SORT_ID",
            Self::SortName => "SORT_NAME",
            Self::Print => "PRINT",
        }
    }
}

impl FromStr for Keyword {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(Self::Add),
            "REMOVE" => Ok(Self::Remove),
            "MOVE" => Ok(Self::Move),
            "SORT_ID" => Ok(Self::SortId),
            "SORT_NAME" => Ok(Self::SortName),
            "PRINT" => Ok(Self::Print),
            other => Err(ApplicationError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add { parent: NodeId, child: NodeId },
    Remove { id: NodeId },
    Move { parent: NodeId, child: NodeId },
    SortId { id: NodeId },
    SortName { id: NodeId },
    Print { id: NodeId },
}

impl Command {
    /// Builds the command from its keyword and exactly `keyword.arity()` arguments.
    pub fn from_args(keyword: Keyword, args: &[NodeId]) -> Result<Self, ApplicationError> {
        if args.len() != keyword.arity() {
            return Err(ApplicationError::Malformed {
                command: keyword.to_string(),
                token: format!("expected {} arguments, got {}", keyword.arity(), args.len()),
            });
        }
        Ok(match keyword {
            Keyword::Add => Self::Add {
                parent: args[0],
                child: args[1],
            },
            Keyword::Move => Self::Move {
                parent: args[0],
                child: args[1],
            },
            Keyword::Remove => Self::Remove { id: args[0] },
            Keyword::SortId => Self::SortId { id: args[0] },
            Keyword::SortName => Self::SortName { id: args[0] },
            Keyword::Print => Self::Print { id: args[0] },
        })
    }

    pub fn keyword(&self) -> Keyword {
        match self {
            Self::Add { .. } => Keyword::Add,
            Self::Remove { .. } => Keyword::Remove,
            Self::Move { .. } => Keyword::Move,
            Self::SortId { .. } => Keyword::SortId,
            Self::SortName { .. } => Keyword::SortName,
            Self::Print { .. } => Keyword::Print,
        }
    }
}

impl FromStr for Command {
    type Err = ApplicationError;

    /// Parses a single command line such as `MOVE 3 7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let keyword: Keyword = parts
            .next()
            .ok_or_else(|| ApplicationError::UnknownCommand(String::new()))?
            .parse()?;
        let args = parts
            .map(|token| {
                token.parse::<NodeId>().map_err(|_| ApplicationError::Malformed {
                    command: keyword.to_string(),
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_args(keyword, &args)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { parent, child } | Self::Move { parent, child } => {
                write!(f, "{} {} {}", self.keyword(), parent, child)
            }
            Self::Remove { id } | Self::SortId { id } | Self::SortName { id } | Self::Print { id } => {
                write!(f, "{} {}", self.keyword(), id)
            }
        }
    }
}
