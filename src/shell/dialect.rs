//! Shell quoting dialects and their escape tables.

use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a dialect identifier is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown shell dialect '{0}'")]
pub struct UnknownDialect(pub String);

/// A shell whose quoting rules determine how a secret can be re-emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// POSIX Bourne family as traced by ash/dash.
    #[default]
    Posix,
    /// Bash, ksh and zsh.
    Bash,
    /// PowerShell (Windows PowerShell and pwsh).
    PowerShell,
}

/// How a dialect renders a `'` inside a single-quoted string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleQuoteStyle {
    /// Close the quote and emit the whole run of quotes double-quoted: `'"''"'`.
    DoubleQuotedRun,
    /// Close the quote, emit `\'`, reopen: `'\''`.
    BackslashEscaped,
    /// Double the quote inside the literal: `''`.
    Doubled,
}

const UNQUOTED: u8 = 0b01;
const DOUBLE_QUOTED: u8 = 0b10;

/// Per-byte classification for one dialect.
pub struct ByteTable([u8; 256]);

impl ByteTable {
    fn build(unquoted: &[u8], double_quoted: &[u8]) -> Self {
        let mut table = [0u8; 256];
        for &b in unquoted {
            table[usize::from(b)] |= UNQUOTED;
        }
        for &b in double_quoted {
            table[usize::from(b)] |= DOUBLE_QUOTED;
        }
        Self(table)
    }

    fn has(&self, b: u8, class: u8) -> bool {
        self.0[usize::from(b)] & class != 0
    }
}

/// Static escape rules for one dialect.
pub struct DialectRules {
    /// Canonical identifier.
    pub id: &'static str,
    /// Byte that escapes the next byte outside single quotes.
    pub escape: u8,
    /// Rendering of `'` inside single quotes.
    pub single_quote: SingleQuoteStyle,
    table: Lazy<ByteTable>,
}

// POSIX Shell Command Language 2.2: the quoting-required set plus the
// characters that are special only in some positions.
const POSIX_UNQUOTED: &[u8] = b"|&;<>()$`\\\"' \t\n*?[#~=%";
const POSIX_DOUBLE_QUOTED: &[u8] = b"$`\"\\";

// History expansion and brace expansion on top of POSIX.
const BASH_UNQUOTED: &[u8] = b"|&;<>()$`\\\"' \t\n*?[#~=%!{}^";

const POWERSHELL_UNQUOTED: &[u8] = b"`$\"' \t\n(){}[];,&|@#<>";
const POWERSHELL_DOUBLE_QUOTED: &[u8] = b"`$\"";

static POSIX: DialectRules = DialectRules {
    id: "posix",
    escape: b'\\',
    single_quote: SingleQuoteStyle::DoubleQuotedRun,
    table: Lazy::new(|| ByteTable::build(POSIX_UNQUOTED, POSIX_DOUBLE_QUOTED)),
};

static BASH: DialectRules = DialectRules {
    id: "bash",
    escape: b'\\',
    single_quote: SingleQuoteStyle::BackslashEscaped,
    table: Lazy::new(|| ByteTable::build(BASH_UNQUOTED, POSIX_DOUBLE_QUOTED)),
};

static POWERSHELL: DialectRules = DialectRules {
    id: "powershell",
    escape: b'`',
    single_quote: SingleQuoteStyle::Doubled,
    table: Lazy::new(|| ByteTable::build(POWERSHELL_UNQUOTED, POWERSHELL_DOUBLE_QUOTED)),
};

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 3] = [Dialect::Posix, Dialect::Bash, Dialect::PowerShell];

    /// The static rule record for this dialect.
    pub fn rules(self) -> &'static DialectRules {
        match self {
            Dialect::Posix => &POSIX,
            Dialect::Bash => &BASH,
            Dialect::PowerShell => &POWERSHELL,
        }
    }

    /// Canonical identifier, as accepted by [`FromStr`].
    pub fn id(self) -> &'static str {
        self.rules().id
    }

    /// Whether `b` must be escaped or quoted when it appears in a bare word.
    ///
    /// Bytes the table does not classify (high-bit bytes, most control
    /// bytes) are treated as literal.
    pub fn is_special_unquoted(self, b: u8) -> bool {
        self.rules().table.has(b, UNQUOTED)
    }

    /// Whether `b` must be escaped inside a double-quoted string.
    pub fn is_special_double_quoted(self, b: u8) -> bool {
        self.rules().table.has(b, DOUBLE_QUOTED)
    }

    /// Whether the shell would have to quote `secret` to re-emit it.
    pub fn needs_quoting(self, secret: &[u8]) -> bool {
        secret.iter().any(|&b| self.is_special_unquoted(b))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "posix" | "sh" | "ash" | "dash" | "almquist" => Ok(Dialect::Posix),
            "bash" | "ksh" | "zsh" => Ok(Dialect::Bash),
            "powershell" | "pwsh" | "ps" => Ok(Dialect::PowerShell),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}
