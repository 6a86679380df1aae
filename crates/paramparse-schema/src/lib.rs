//! Serializable declarations for a `ParamParser` and reports of what it resolved.
//!
//! The types here are the JSON form of a set of parameter declarations, and are
//! used for:
//! - declaring a parser in a file instead of in Rust (`paramparse --schema`)
//! - dumping the bound values after a parse as a stable, ordered document

use indexmap::IndexMap;
use paramparse::{ParamError, ParamParser, Parameter, ValuePolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current value of `format-version` in a schema document.
pub const SCHEMA_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema format version {0} (expected {expected})", expected = SCHEMA_FORMAT_VERSION)]
    UnsupportedVersion(u32),

    #[error("parameter #{index}: {source}")]
    Param {
        index: usize,
        #[source]
        source: ParamError,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ValuePolicyDef {
    #[default]
    AcceptAny,
    RejectDashed,
}

impl From<ValuePolicyDef> for ValuePolicy {
    fn from(def: ValuePolicyDef) -> Self {
        match def {
            ValuePolicyDef::AcceptAny => ValuePolicy::AcceptAny,
            ValuePolicyDef::RejectDashed => ValuePolicy::RejectDashed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ParamDef {
    /// Combined names such as `"h,help"`. Takes precedence over `short`/`long`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_value: String,
    #[serde(default, skip_serializing_if = "String::is_empty", alias = "help")]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub flag: bool,
}

impl ParamDef {
    pub fn to_parameter(&self) -> Result<Parameter, ParamError> {
        let mut param = match &self.names {
            Some(names) => Parameter::new(names)?,
            None => {
                let mut param = Parameter::default();
                if let Some(short) = &self.short {
                    param = param.short(short.as_str());
                }
                if let Some(long) = &self.long {
                    param = param.long(long.as_str());
                }
                param
            }
        };

        if !self.default_value.is_empty() {
            param = param.with_default(self.default_value.as_str());
        }
        param = param.help(self.description.as_str());
        if self.required {
            param = param.required();
        }
        if self.flag {
            param = param.flag();
        }
        Ok(param)
    }
}

fn default_format_version() -> u32 {
    SCHEMA_FORMAT_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParserSchema {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usage: Vec<String>,
    #[serde(default)]
    pub value_policy: ValuePolicyDef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamDef>,
}

impl ParserSchema {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_slice(bytes)?;
        if schema.format_version != SCHEMA_FORMAT_VERSION {
            return Err(SchemaError::UnsupportedVersion(schema.format_version));
        }
        Ok(schema)
    }

    /// Encode as JSON bytes.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_default()
    }

    /// Register every declared parameter, in order, with a fresh parser.
    ///
    /// Later declarations reconcile against earlier ones exactly as repeated
    /// `add_parameter` calls do.
    pub fn build(&self) -> Result<ParamParser, SchemaError> {
        let mut parser = ParamParser::new().with_value_policy(self.value_policy.into());
        for line in &self.usage {
            parser.add_usage_string(line.as_str());
        }
        for (index, def) in self.params.iter().enumerate() {
            def.to_parameter()
                .and_then(|param| parser.add_parameter(param).map(|_| ()))
                .map_err(|source| SchemaError::Param { index, source })?;
        }
        Ok(parser)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedParam {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub long: String,
    #[serde(default)]
    pub value: String,
    pub parsed: bool,
    #[serde(default)]
    pub flag: bool,
    #[serde(default)]
    pub required: bool,
}

impl From<&Parameter> for ResolvedParam {
    fn from(param: &Parameter) -> Self {
        Self {
            short: param.short_name().to_string(),
            long: param.long_name().to_string(),
            value: param.value().to_string(),
            parsed: param.is_parsed(),
            flag: param.is_flag(),
            required: param.is_required(),
        }
    }
}

/// Bound state of every parameter after a parse, keyed by display name in
/// registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParseReport {
    pub program: String,
    pub params: IndexMap<String, ResolvedParam>,
}

impl ParseReport {
    pub fn from_parser(program: impl Into<String>, parser: &ParamParser) -> Self {
        let params = parser
            .all_params()
            .into_iter()
            .map(|p| (p.display_name().to_string(), ResolvedParam::from(p)))
            .collect();
        Self {
            program: program.into(),
            params,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_SCHEMA: &str = r#"{
        "name": "server",
        "summary": "Run the demo server",
        "usage": ["server --port=8080 -a 127.0.0.1"],
        "params": [
            { "names": "h,help", "flag": true, "description": "Show help" },
            { "long": "port", "required": true, "default-value": "8080" },
            { "short": "a", "long": "ip-address", "required": true, "help": "Bind address" }
        ]
    }"#;

    #[test]
    fn schema_builds_a_working_parser() {
        let schema = ParserSchema::from_json_slice(SERVER_SCHEMA.as_bytes()).unwrap();
        assert_eq!(schema.format_version, SCHEMA_FORMAT_VERSION);
        assert_eq!(schema.value_policy, ValuePolicyDef::AcceptAny);

        let mut parser = schema.build().unwrap();
        assert_eq!(parser.parameters_count(), 3);
        assert_eq!(parser.usage_strings(), ["server --port=8080 -a 127.0.0.1"]);
        assert_eq!(parser.arg("a").unwrap().description(), "Bind address");

        parser.parse(["server", "-h", "-a", "10.0.0.2"]).unwrap();
        assert!(parser.arg("help").unwrap().is_parsed());
        assert_eq!(parser.arg("port").unwrap().value(), "8080");
        assert_eq!(parser.arg("ip-address").unwrap().value(), "10.0.0.2");
    }

    #[test]
    fn report_keeps_registration_order() {
        let schema = ParserSchema::from_json_slice(SERVER_SCHEMA.as_bytes()).unwrap();
        let mut parser = schema.build().unwrap();
        parser.parse(["server", "-a", "::1"]).unwrap();

        let report = ParseReport::from_parser("server", &parser);
        let keys: Vec<&str> = report.params.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["help", "port", "ip-address"]);

        let port = &report.params["port"];
        assert_eq!(port.value, "8080");
        assert!(!port.parsed);
        assert!(port.required);

        let json = report.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["program"], "server");
        assert_eq!(value["params"]["ip-address"]["value"], "::1");
        assert_eq!(value["params"]["ip-address"]["parsed"], true);
        assert!(value["params"]["port"].get("short").is_none());
    }

    #[test]
    fn value_policy_is_carried_into_the_parser() {
        let schema = ParserSchema::from_json_slice(
            br#"{ "name": "calc", "value-policy": "reject-dashed", "params": [{ "long": "offset" }] }"#,
        )
        .unwrap();
        let parser = schema.build().unwrap();
        assert_eq!(parser.value_policy(), ValuePolicy::RejectDashed);
    }

    #[test]
    fn bad_parameter_reports_its_position() {
        let schema = ParserSchema::from_json_slice(
            br#"{ "name": "bad", "params": [{ "long": "ok" }, { "names": "a,b" }] }"#,
        )
        .unwrap();
        let err = schema.build().unwrap_err();
        match err {
            SchemaError::Param { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(source, ParamError::TwoShortNames(_, _)));
            }
            other => panic!("expected Param, got: {other:?}"),
        }
    }

    #[test]
    fn unknown_format_version_is_rejected() {
        let err = ParserSchema::from_json_slice(br#"{ "format-version": 2, "name": "x" }"#)
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedVersion(2)));

        let err = ParserSchema::from_json_slice(b"{ not json").unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }

    #[test]
    fn schema_round_trips_through_json() {
        let schema = ParserSchema::from_json_slice(SERVER_SCHEMA.as_bytes()).unwrap();
        let again = ParserSchema::from_json_slice(&schema.to_json_bytes()).unwrap();
        assert_eq!(again.params.len(), 3);
        assert_eq!(again.params[1].default_value, "8080");
    }
}
