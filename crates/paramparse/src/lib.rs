//! Declared command-line parameters and a small argv matcher.
//!
//! Callers declare [`Parameter`]s (short/long alias, default value, description,
//! required/flag markers), register them with a [`ParamParser`], then feed it the
//! process argument vector. The parser binds values into the registered records
//! in place and reports the first problem it finds.
//!
//! ```
//! use paramparse::{ParamParser, Parameter};
//!
//! let mut parser = ParamParser::new();
//! parser
//!     .add_parameter(Parameter::new("h,help")?.flag())?
//!     .add_parameter(Parameter::new("port")?.with_default("8080"))?;
//!
//! parser.parse(["server", "--port=9000"])?;
//! assert_eq!(parser.arg("port").map(|p| p.value_as::<u16>()), Some(9000));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The crate never exits the process and never logs; errors are returned to the
//! caller, who is expected to treat any of them as fatal for the invocation.

pub mod error {
    use thiserror::Error;

    /// Problems building or registering a [`Parameter`](crate::Parameter).
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum ParamError {
        #[error("command line parameter must have a name")]
        NoName,

        #[error("command line parameter must have only one short name: '{0}', '{1}'")]
        TwoShortNames(String, String),

        #[error("command line parameter must have only one long name: '{0}', '{1}'")]
        TwoLongNames(String, String),

        #[error("command line parameter accepts at most two names, got {0}")]
        TooManyNames(usize),

        #[error("short name must be exactly one character: '{0}'")]
        InvalidShortName(String),

        #[error("long name must be at least two characters: '{0}'")]
        InvalidLongName(String),
    }

    /// The first problem found while matching an argument vector.
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum ParseError {
        #[error("not all required arguments are specified")]
        InsufficientArguments { required: usize, supplied: usize },

        #[error("parameter format parse error: {0}")]
        MalformedToken(String),

        #[error("unknown parameter key specified: {0}")]
        UnknownKey(String),

        #[error("expected value for the key: {0}")]
        MissingValue(String),

        #[error("expected required parameter value: {short} [{long}]")]
        MissingRequired { short: String, long: String },

        #[error("argument is not valid UTF-8: {0}")]
        NonUtf8Argument(String),
    }
}

pub mod value {
    /// Lenient conversion from a parameter's stored text.
    ///
    /// Conversions never fail: the longest valid leading prefix is converted
    /// (`"10abc"` reads as `10`) and anything unusable, including out-of-range
    /// numbers, reads as the type's default. Callers that need to reject bad
    /// input should inspect [`Parameter::value`](crate::Parameter::value) directly.
    pub trait FromParamValue: Default {
        fn from_param_value(raw: &str) -> Self;
    }

    fn integer_prefix(raw: &str) -> &str {
        let bytes = raw.as_bytes();
        let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
        let digits = bytes[sign..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 { "" } else { &raw[..sign + digits] }
    }

    fn float_prefix(raw: &str) -> &str {
        let bytes = raw.as_bytes();
        let count_digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

        let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
        let int_digits = count_digits(end);
        end += int_digits;

        let mut frac_digits = 0;
        if bytes.get(end) == Some(&b'.') {
            frac_digits = count_digits(end + 1);
            if int_digits + frac_digits > 0 {
                end += 1 + frac_digits;
            }
        }
        if int_digits + frac_digits == 0 {
            return "";
        }

        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut exp = end + 1;
            if matches!(bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            let exp_digits = count_digits(exp);
            if exp_digits > 0 {
                end = exp + exp_digits;
            }
        }

        &raw[..end]
    }

    macro_rules! impl_from_param_value {
        ($prefix:ident => $($ty:ty),* $(,)?) => {
            $(
                impl FromParamValue for $ty {
                    fn from_param_value(raw: &str) -> Self {
                        $prefix(raw.trim_start()).parse().unwrap_or_default()
                    }
                }
            )*
        };
    }

    impl_from_param_value!(integer_prefix => i8, i16, i32, i64, i128, isize);
    impl_from_param_value!(integer_prefix => u8, u16, u32, u64, u128, usize);
    impl_from_param_value!(float_prefix => f32, f64);

    impl FromParamValue for bool {
        fn from_param_value(raw: &str) -> Self {
            let raw = raw.trim();
            if raw.eq_ignore_ascii_case("true") {
                return true;
            }
            i64::from_param_value(raw) != 0
        }
    }

    impl FromParamValue for char {
        fn from_param_value(raw: &str) -> Self {
            raw.trim_start().chars().next().unwrap_or_default()
        }
    }

    impl FromParamValue for String {
        fn from_param_value(raw: &str) -> Self {
            raw.to_string()
        }
    }
}

pub mod param {
    use crate::error::ParamError;
    use crate::value::FromParamValue;

    pub(crate) fn strip_dashes(raw: &str) -> &str {
        raw.trim_start_matches('-')
    }

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    /// A declared command-line parameter.
    ///
    /// Names are stored without leading dashes. A short name is exactly one
    /// character, a long name two or more.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Parameter {
        short_name: String,
        long_name: String,
        default_value: String,
        description: String,
        value: String,
        required: bool,
        flag: bool,
        parsed: bool,
    }

    impl Parameter {
        /// Build a parameter from a combined name such as `"h,help"` or `"--port"`.
        ///
        /// Pieces are trimmed and stripped of leading dashes; the one-character
        /// piece becomes the short name whatever the order.
        pub fn new(names: &str) -> Result<Self, ParamError> {
            let pieces: Vec<&str> = names
                .split(',')
                .map(|piece| strip_dashes(piece.trim()))
                .filter(|piece| !piece.is_empty())
                .collect();

            match pieces.as_slice() {
                [] => Err(ParamError::NoName),
                [only] if char_len(only) == 1 => Ok(Self::default().short(*only)),
                [only] => Ok(Self::default().long(*only)),
                [a, b] => match (char_len(a), char_len(b)) {
                    (1, 1) => Err(ParamError::TwoShortNames(a.to_string(), b.to_string())),
                    (la, lb) if la > 1 && lb > 1 => {
                        Err(ParamError::TwoLongNames(a.to_string(), b.to_string()))
                    }
                    (la, lb) if la < lb => Ok(Self::default().short(*a).long(*b)),
                    _ => Ok(Self::default().short(*b).long(*a)),
                },
                more => Err(ParamError::TooManyNames(more.len())),
            }
        }

        pub fn short(mut self, name: impl Into<String>) -> Self {
            let name: String = name.into();
            self.short_name = strip_dashes(&name).to_string();
            self
        }

        pub fn long(mut self, name: impl Into<String>) -> Self {
            let name: String = name.into();
            self.long_name = strip_dashes(&name).to_string();
            self
        }

        pub fn with_default(mut self, value: impl Into<String>) -> Self {
            self.default_value = value.into();
            self
        }

        pub fn help(mut self, description: impl Into<String>) -> Self {
            self.description = description.into();
            self
        }

        /// Pre-bind a value. A default only applies while the value is empty.
        pub fn with_value(mut self, value: impl Into<String>) -> Self {
            self.value = value.into();
            self
        }

        pub fn required(mut self) -> Self {
            self.required = true;
            self
        }

        /// Mark as a flag: presence alone is the signal, no value is consumed.
        pub fn flag(mut self) -> Self {
            self.flag = true;
            self
        }

        pub fn short_name(&self) -> &str {
            &self.short_name
        }

        pub fn long_name(&self) -> &str {
            &self.long_name
        }

        /// Long name if present, otherwise the short name.
        pub fn display_name(&self) -> &str {
            if self.long_name.is_empty() {
                &self.short_name
            } else {
                &self.long_name
            }
        }

        pub fn default_value(&self) -> &str {
            &self.default_value
        }

        pub fn description(&self) -> &str {
            &self.description
        }

        pub fn value(&self) -> &str {
            &self.value
        }

        pub fn is_required(&self) -> bool {
            self.required
        }

        pub fn is_flag(&self) -> bool {
            self.flag
        }

        /// Whether a token on the command line bound this parameter.
        ///
        /// Values filled in from the default do not count.
        pub fn is_parsed(&self) -> bool {
            self.parsed
        }

        /// Convert the stored value; an empty value yields `T::default()`.
        ///
        /// See [`FromParamValue`] for the lenient conversion rules.
        pub fn value_as<T: FromParamValue>(&self) -> T {
            if self.value.is_empty() {
                T::default()
            } else {
                T::from_param_value(&self.value)
            }
        }

        pub fn value_as_str(&self) -> &str {
            &self.value
        }

        /// Check the naming rules enforced on registration.
        pub fn validate(&self) -> Result<(), ParamError> {
            if self.short_name.is_empty() && self.long_name.is_empty() {
                return Err(ParamError::NoName);
            }
            if !self.short_name.is_empty() && char_len(&self.short_name) != 1 {
                return Err(ParamError::InvalidShortName(self.short_name.clone()));
            }
            if !self.long_name.is_empty() && char_len(&self.long_name) < 2 {
                return Err(ParamError::InvalidLongName(self.long_name.clone()));
            }
            Ok(())
        }

        pub(crate) fn apply_default(&mut self) {
            if !self.default_value.is_empty() && self.value.is_empty() {
                self.value = self.default_value.clone();
            }
        }

        pub(crate) fn mark_parsed(&mut self) {
            self.parsed = true;
        }

        pub(crate) fn bind(&mut self, value: String) {
            self.value = value;
            self.parsed = true;
        }
    }
}

pub mod parser {
    use std::collections::{BTreeSet, HashMap};
    use std::ffi::OsString;

    use crate::error::{ParamError, ParseError};
    use crate::param::{Parameter, strip_dashes};

    /// What to do when a value-taking key is followed by a token starting with `-`.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub enum ValuePolicy {
        /// Take the next token verbatim (`--offset -5` binds `-5`).
        #[default]
        AcceptAny,
        /// Treat a dash-prefixed next token as a missing value.
        RejectDashed,
    }

    /// Registry of declared parameters and the matcher that binds argv to them.
    ///
    /// Records live in an arena; the alias map stores slot indices so both names
    /// of a parameter resolve to the same record. Records displaced by a later
    /// registration stay in the arena unreachable until [`reset`](Self::reset).
    #[derive(Debug, Clone, Default)]
    pub struct ParamParser {
        slots: Vec<Parameter>,
        aliases: HashMap<String, usize>,
        usage: Vec<String>,
        value_policy: ValuePolicy,
    }

    impl ParamParser {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_value_policy(mut self, policy: ValuePolicy) -> Self {
            self.value_policy = policy;
            self
        }

        pub fn value_policy(&self) -> ValuePolicy {
            self.value_policy
        }

        /// Register a parameter under each of its non-empty names.
        ///
        /// When a name is already taken by another record whose other name
        /// differs, that record loses its other name and the taken name moves to
        /// the new record. Registering the exact same pair of names again keeps
        /// the first record.
        pub fn add_parameter(&mut self, param: Parameter) -> Result<&mut Self, ParamError> {
            param.validate()?;
            let slot = self.slots.len();

            if !param.short_name().is_empty() {
                match self.aliases.get(param.short_name()).copied() {
                    Some(existing) => {
                        let displaced_long = self.slots[existing].long_name().to_string();
                        if displaced_long != param.long_name() {
                            self.retire_alias(&displaced_long, existing);
                            self.aliases.insert(param.short_name().to_string(), slot);
                        }
                    }
                    None => {
                        self.aliases.insert(param.short_name().to_string(), slot);
                    }
                }
            }

            if !param.long_name().is_empty() {
                match self.aliases.get(param.long_name()).copied() {
                    Some(existing) => {
                        let displaced_short = self.slots[existing].short_name().to_string();
                        if displaced_short != param.short_name() {
                            self.retire_alias(&displaced_short, existing);
                            self.aliases.insert(param.long_name().to_string(), slot);
                        }
                    }
                    None => {
                        self.aliases.insert(param.long_name().to_string(), slot);
                    }
                }
            }

            if self.aliases.values().any(|&idx| idx == slot) {
                let mut param = param;
                param.apply_default();
                self.slots.push(param);
            }

            Ok(self)
        }

        fn retire_alias(&mut self, alias: &str, owner: usize) {
            if !alias.is_empty() && self.aliases.get(alias) == Some(&owner) {
                self.aliases.remove(alias);
            }
        }

        pub fn add_usage_string(&mut self, usage: impl Into<String>) -> &mut Self {
            self.usage.push(usage.into());
            self
        }

        pub fn usage_strings(&self) -> &[String] {
            &self.usage
        }

        /// Look up a parameter by either name; leading dashes are ignored.
        pub fn arg(&self, alias: &str) -> Option<&Parameter> {
            self.aliases
                .get(strip_dashes(alias))
                .map(|&idx| &self.slots[idx])
        }

        fn live_slots(&self) -> BTreeSet<usize> {
            self.aliases.values().copied().collect()
        }

        /// Every registered parameter once, in registration order.
        pub fn all_params(&self) -> Vec<&Parameter> {
            self.live_slots()
                .into_iter()
                .map(|idx| &self.slots[idx])
                .collect()
        }

        pub fn parameters_count(&self) -> usize {
            self.live_slots().len()
        }

        fn required_count(&self) -> usize {
            self.all_params()
                .into_iter()
                .filter(|p| p.is_required())
                .count()
        }

        /// Drop every parameter and usage string. The value policy is kept.
        pub fn reset(&mut self) {
            self.slots.clear();
            self.aliases.clear();
            self.usage.clear();
        }

        /// Match `args` against the registered parameters.
        ///
        /// `args[0]` is the program name and is never treated as a key. Values
        /// are bound in place as tokens are consumed; on error, bindings made
        /// before the failing token are kept.
        pub fn parse<I, S>(&mut self, args: I) -> Result<(), ParseError>
        where
            I: IntoIterator<Item = S>,
            S: AsRef<str>,
        {
            let args: Vec<S> = args.into_iter().collect();
            let supplied = args.len().saturating_sub(1);
            let required = self.required_count();
            if supplied < required {
                return Err(ParseError::InsufficientArguments { required, supplied });
            }

            let policy = self.value_policy;
            let mut i = 1usize;
            while i < args.len() {
                let raw: &str = args[i].as_ref();
                let (key, inline_value) = split_token(raw)?;

                let Some(&idx) = self.aliases.get(key) else {
                    return Err(ParseError::UnknownKey(raw.to_string()));
                };
                let param = &mut self.slots[idx];

                if param.is_flag() {
                    param.mark_parsed();
                    i += 1;
                    continue;
                }

                let value = match inline_value {
                    Some(value) => {
                        i += 1;
                        value.to_string()
                    }
                    None => {
                        let next: Option<&str> = args.get(i + 1).map(|s| s.as_ref());
                        let Some(next) = next else {
                            return Err(ParseError::MissingValue(key.to_string()));
                        };
                        if policy == ValuePolicy::RejectDashed && next.starts_with('-') {
                            return Err(ParseError::MissingValue(key.to_string()));
                        }
                        i += 2;
                        next.to_string()
                    }
                };
                param.bind(value);
            }

            self.check_required()
        }

        /// Like [`parse`](Self::parse), for arguments straight from the OS.
        pub fn parse_os<I>(&mut self, args: I) -> Result<(), ParseError>
        where
            I: IntoIterator<Item = OsString>,
        {
            let args = args
                .into_iter()
                .map(|arg| {
                    arg.into_string().map_err(|raw| {
                        ParseError::NonUtf8Argument(raw.to_string_lossy().into_owned())
                    })
                })
                .collect::<Result<Vec<String>, _>>()?;
            self.parse(args)
        }

        /// Parse the current process arguments.
        pub fn parse_env(&mut self) -> Result<(), ParseError> {
            self.parse_os(std::env::args_os())
        }

        fn check_required(&self) -> Result<(), ParseError> {
            match self
                .all_params()
                .into_iter()
                .find(|p| p.is_required() && p.value().is_empty())
            {
                Some(p) => Err(ParseError::MissingRequired {
                    short: p.short_name().to_string(),
                    long: p.long_name().to_string(),
                }),
                None => Ok(()),
            }
        }

        pub fn help(&self) -> String {
            crate::help::render(&self.all_params(), &self.usage)
        }

        pub fn print_help(&self) {
            print!("{}", self.help());
        }
    }

    /// Split a raw token into its candidate key and optional inline value.
    ///
    /// `--port=8080` gives `("port", Some("8080"))`, `-a` gives `("a", None)`.
    fn split_token(raw: &str) -> Result<(&str, Option<&str>), ParseError> {
        let stripped = strip_dashes(raw);
        if stripped.chars().count() == 1 {
            return Ok((stripped, None));
        }

        let (key, value) = match stripped.split_once('=') {
            Some((key, value)) => (key.trim_matches(' '), value.trim_matches(' ')),
            None => (stripped.trim_matches(' '), ""),
        };
        if key.is_empty() && value.is_empty() {
            return Err(ParseError::MalformedToken(raw.to_string()));
        }

        Ok((key, (!value.is_empty()).then_some(value)))
    }
}

pub mod help {
    use crate::param::Parameter;

    const TAB: &str = "    ";

    /// Render the usage block followed by one aligned row per parameter.
    pub fn render(params: &[&Parameter], usage: &[String]) -> String {
        let long_width = params
            .iter()
            .map(|p| p.long_name().chars().count())
            .max()
            .unwrap_or(0);
        let default_width = params
            .iter()
            .map(|p| p.default_value().chars().count())
            .max()
            .unwrap_or(0);

        let mut out = String::from("Usage:\n");
        for line in usage {
            out.push_str(&format!("{TAB}{line}\n"));
        }
        out.push('\n');

        for p in params {
            out.push_str(&format!("{TAB}{} ", p.short_name()));
            if !p.long_name().is_empty() {
                out.push_str(&format!(" [ {:<long_width$} ] ", p.long_name()));
            }
            if p.default_value().is_empty() {
                out.push_str(&" ".repeat(default_width + TAB.len()));
            } else {
                out.push_str(&format!("(={:<default_width$}) ", p.default_value()));
            }
            out.push_str(p.description());
            out.push('\n');
        }

        out
    }
}

pub use error::{ParamError, ParseError};
pub use param::Parameter;
pub use parser::{ParamParser, ValuePolicy};
pub use value::FromParamValue;
