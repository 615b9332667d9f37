//! Transit JSON decoding.

use super::value::{TransitMap, Value};
use crate::error::TransitError;

use chrono::{DateTime, TimeZone as _, Utc};
use serde_json::Value as Json;
use uuid::Uuid;

pub(super) const MAP_MARKER: &str = "^ ";
const CACHE_CODE_DIGITS: usize = 44;
const CACHE_BASE_CHAR: u32 = 48;
const MAX_CACHE_ENTRIES: usize = CACHE_CODE_DIGITS * CACHE_CODE_DIGITS;
/// Measured in UTF-16 code units, as Transit writers count string length.
const MIN_CACHEABLE_LEN: usize = 4;

/// Decode a Transit JSON document.
pub fn decode(text: &str) -> Result<Value, TransitError> {
    let json: Json = serde_json::from_str(text)
        .map_err(|error| TransitError::malformed(format!("invalid JSON: {error}")))?;
    decode_json(&json)
}

/// Decode an already-parsed JSON document.
pub fn decode_json(json: &Json) -> Result<Value, TransitError> {
    let mut reader = Reader::default();
    reader.value(json, false)
}

/// Result of parsing one JSON string. A `~#tag` string is only meaningful at
/// the head of a two-element array, so it is kept apart from real values.
#[derive(Debug, Clone)]
enum Parsed {
    Value(Value),
    Tag(String),
}

/// Rolling read cache shared by one document.
#[derive(Debug, Default)]
struct ReadCache {
    entries: Vec<Parsed>,
}

impl ReadCache {
    fn remember(&mut self, parsed: &Parsed) {
        if self.entries.len() == MAX_CACHE_ENTRIES {
            self.entries.clear();
        }
        self.entries.push(parsed.clone());
    }

    fn lookup(&self, code: &str) -> Result<Parsed, TransitError> {
        let index = cache_index(code)
            .ok_or_else(|| TransitError::malformed(format!("invalid cache code {code:?}")))?;
        self.entries
            .get(index)
            .cloned()
            .ok_or_else(|| TransitError::malformed(format!("unknown cache reference {code:?}")))
    }
}

/// `^0` is index 0, `^10` would be 1 * 44 + 0 and so on.
fn cache_index(code: &str) -> Option<usize> {
    let digits: Vec<u32> = code.chars().skip(1).map(|c| c as u32).collect();
    let digit = |c: u32| {
        c.checked_sub(CACHE_BASE_CHAR)
            .map(|d| d as usize)
            .filter(|d| *d < CACHE_CODE_DIGITS)
    };
    match digits.as_slice() {
        [low] => digit(*low),
        [high, low] => Some(digit(*high)? * CACHE_CODE_DIGITS + digit(*low)?),
        _ => None,
    }
}

fn is_cacheable(text: &str, as_map_key: bool) -> bool {
    text.encode_utf16().count() >= MIN_CACHEABLE_LEN
        && (as_map_key
            || text.starts_with("~:")
            || text.starts_with("~$")
            || text.starts_with("~#"))
}

#[derive(Debug, Default)]
struct Reader {
    cache: ReadCache,
}

impl Reader {
    fn value(&mut self, json: &Json, as_map_key: bool) -> Result<Value, TransitError> {
        match self.parse(json, as_map_key)? {
            Parsed::Value(value) => Ok(value),
            Parsed::Tag(tag) => Err(TransitError::malformed(format!(
                "tag ~#{tag} outside of a tagged array"
            ))),
        }
    }

    fn parse(&mut self, json: &Json, as_map_key: bool) -> Result<Parsed, TransitError> {
        let value = match json {
            Json::Null => Value::Null,
            Json::Bool(flag) => Value::Bool(*flag),
            Json::Number(number) => match number.as_i64() {
                Some(int) => Value::Int(int),
                None => Value::Float(number.as_f64().ok_or_else(|| {
                    TransitError::malformed(format!("unrepresentable number {number}"))
                })?),
            },
            Json::String(text) => return self.string(text, as_map_key),
            Json::Array(items) => self.array(items)?,
            Json::Object(object) => self.object(object)?,
        };
        Ok(Parsed::Value(value))
    }

    fn string(&mut self, text: &str, as_map_key: bool) -> Result<Parsed, TransitError> {
        if text.starts_with('^') && text != MAP_MARKER {
            return self.cache.lookup(text);
        }

        let parsed = parse_scalar(text)?;
        if is_cacheable(text, as_map_key) {
            self.cache.remember(&parsed);
        }
        Ok(parsed)
    }

    fn array(&mut self, items: &[Json]) -> Result<Value, TransitError> {
        match items.first() {
            Some(Json::String(head)) if head == MAP_MARKER => {
                return self.pairs(&items[1..], true).map(Value::Map);
            }
            _ => {}
        }

        if let [head @ Json::String(_), rep] = items {
            return match self.parse(head, false)? {
                Parsed::Tag(tag) => self.tagged(tag, rep),
                Parsed::Value(first) => {
                    let second = self.value(rep, false)?;
                    Ok(Value::Array(vec![first, second]))
                }
            };
        }

        let values = items
            .iter()
            .map(|item| self.value(item, false))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(values))
    }

    /// Verbose-mode maps and `{"~#tag": rep}` tagged values.
    fn object(
        &mut self,
        object: &serde_json::Map<String, Json>,
    ) -> Result<Value, TransitError> {
        if object.len() == 1 {
            if let Some((key, rep)) = object.iter().next() {
                if let Some(tag) = key.strip_prefix("~#") {
                    return self.tagged(tag.to_string(), rep);
                }
            }
        }

        let mut map = TransitMap::new();
        for (key, value) in object {
            let key = match self.string(key, true)? {
                Parsed::Value(key) => key,
                Parsed::Tag(tag) => {
                    return Err(TransitError::malformed(format!("tag ~#{tag} used as map key")));
                }
            };
            let value = self.value(value, false)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn pairs(&mut self, items: &[Json], as_map_key: bool) -> Result<TransitMap, TransitError> {
        if items.len() % 2 != 0 {
            return Err(TransitError::malformed(format!(
                "map has an odd number of entries ({})",
                items.len()
            )));
        }

        let mut map = TransitMap::new();
        for pair in items.chunks_exact(2) {
            let key = self.value(&pair[0], as_map_key)?;
            let value = self.value(&pair[1], false)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn tagged(&mut self, tag: String, rep: &Json) -> Result<Value, TransitError> {
        match tag.as_str() {
            "'" => self.value(rep, false),
            "list" => Ok(Value::List(self.sequence(&tag, rep)?)),
            "set" => Ok(Value::Set(self.sequence(&tag, rep)?)),
            "cmap" => match rep {
                Json::Array(items) => self.pairs(items, false).map(Value::Map),
                _ => Err(TransitError::malformed("~#cmap representation must be an array")),
            },
            "u" => match self.value(rep, false)? {
                Value::Array(halves) => uuid_from_halves(&halves).map(Value::Uuid),
                other => Err(TransitError::malformed(format!(
                    "~#u representation must be an array, got {}",
                    other.kind()
                ))),
            },
            _ => {
                let rep = self.value(rep, false)?;
                Ok(Value::Tagged { tag, rep: Box::new(rep) })
            }
        }
    }

    fn sequence(&mut self, tag: &str, rep: &Json) -> Result<Vec<Value>, TransitError> {
        match rep {
            Json::Array(items) => items.iter().map(|item| self.value(item, false)).collect(),
            _ => Err(TransitError::malformed(format!(
                "~#{tag} representation must be an array"
            ))),
        }
    }
}

fn parse_scalar(text: &str) -> Result<Parsed, TransitError> {
    let Some(rest) = text.strip_prefix('~') else {
        return Ok(Parsed::Value(Value::String(text.to_string())));
    };

    let mut chars = rest.chars();
    let Some(tag) = chars.next() else {
        return Err(TransitError::malformed("bare ~ is not a valid string"));
    };
    let rep = chars.as_str();

    let value = match tag {
        '~' | '^' | '`' => Value::String(rest.to_string()),
        '#' => return Ok(Parsed::Tag(rep.to_string())),
        ':' => Value::keyword(rep),
        '$' => Value::symbol(rep),
        '_' => Value::Null,
        '?' => match rep {
            "t" => Value::Bool(true),
            "f" => Value::Bool(false),
            _ => return Err(TransitError::malformed(format!("invalid boolean {text:?}"))),
        },
        'i' => match rep.parse::<i64>() {
            Ok(int) => Value::Int(int),
            Err(_) if is_integer_literal(rep) => Value::Extension {
                tag,
                rep: rep.to_string(),
            },
            Err(_) => return Err(TransitError::malformed(format!("invalid integer {text:?}"))),
        },
        'd' => Value::Float(
            rep.parse()
                .map_err(|_| TransitError::malformed(format!("invalid double {text:?}")))?,
        ),
        'z' => Value::Float(match rep {
            "NaN" => f64::NAN,
            "INF" => f64::INFINITY,
            "-INF" => f64::NEG_INFINITY,
            _ => return Err(TransitError::malformed(format!("invalid special number {text:?}"))),
        }),
        'u' => Value::Uuid(
            Uuid::parse_str(rep)
                .map_err(|error| TransitError::malformed(format!("invalid uuid {rep:?}: {error}")))?,
        ),
        'm' => {
            let millis: i64 = rep
                .parse()
                .map_err(|_| TransitError::malformed(format!("invalid timestamp {text:?}")))?;
            Value::Timestamp(timestamp_from_millis(millis)?)
        }
        't' => Value::Timestamp(
            DateTime::parse_from_rfc3339(rep)
                .map_err(|error| {
                    TransitError::malformed(format!("invalid date {rep:?}: {error}"))
                })?
                .with_timezone(&Utc),
        ),
        other => Value::Extension {
            tag: other,
            rep: rep.to_string(),
        },
    };
    Ok(Parsed::Value(value))
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

pub(super) fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>, TransitError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| TransitError::malformed(format!("timestamp {millis} out of range")))
}

/// `["~#u", [high, low]]` carries the UUID as two signed 64-bit halves.
fn uuid_from_halves(halves: &[Value]) -> Result<Uuid, TransitError> {
    match halves {
        [Value::Int(high), Value::Int(low)] => Ok(Uuid::from_u64_pair(*high as u64, *low as u64)),
        _ => Err(TransitError::malformed(
            "~#u representation must hold two integers",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_map_with_keyword_keys() {
        let value = decode(r#"["^ ","~:type","~:get-project-workflows","~:limit",30]"#).unwrap();
        let map = value.as_map().unwrap();

        assert_eq!(
            map.get_by_name("type"),
            Some(&Value::keyword("get-project-workflows"))
        );
        assert_eq!(map.get_by_name("limit"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_decode_resolves_cached_keys() {
        let text = r#"["~#list",[
            ["^ ","~:workflow/status","running","~:workflow/name","build"],
            ["^ ","^1","blocked","^2","deploy"]
        ]]"#;
        let value = decode(text).unwrap();
        let entries = value.as_seq().unwrap();

        let second = entries[1].as_map().unwrap();
        assert_eq!(second.get_by_name("workflow/status"), Some(&Value::string("blocked")));
        assert_eq!(second.get_by_name("workflow/name"), Some(&Value::string("deploy")));
    }

    #[test]
    fn test_decode_caches_tags_and_non_keyword_map_keys() {
        let text = r#"[["~#point",[1,2]],["^0",[3,4]],["^ ","name",1],["^ ","^1",2]]"#;
        let value = decode(text).unwrap();
        let items = value.as_seq().unwrap();

        assert!(matches!(&items[1], Value::Tagged { tag, .. } if tag == "point"));
        let map = items[3].as_map().unwrap();
        assert_eq!(map.get(&Value::string("name")), Some(&Value::Int(2)));
    }

    #[test]
    fn test_short_non_ascii_keys_are_not_cached() {
        // "éé" is four UTF-8 bytes but only two UTF-16 units.
        let value = decode(r#"[["^ ","éé",1,"~:workflow/status","a"],["^ ","^0","b"]]"#).unwrap();
        let second = value.as_seq().unwrap()[1].as_map().unwrap();

        assert_eq!(second.get_by_name("workflow/status"), Some(&Value::string("b")));
        assert!(second.get(&Value::string("éé")).is_none());
    }

    #[test]
    fn test_short_strings_are_not_cached() {
        // "~:id" is four chars and cacheable, "~:a" is not.
        let value = decode(r#"["^ ","~:a",1,"~:id",2,"^0",3]"#);
        let map = value.unwrap();
        assert_eq!(map.as_map().unwrap().get_by_name("id"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_decode_scalars() {
        let value = decode(
            r#"["~_","~?t","~i9007199254740993","~d1.5","~zINF","~~tilde","~^caret",
                "~u5e3dc3c2-7f7c-4b1b-9d0a-1f2c3b4a5d6e","~m1546300800000",
                "~t2019-01-01T00:00:00.000Z","~$run/cancel","~rhttps://circleci.com"]"#,
        )
        .unwrap();
        let items = value.as_seq().unwrap();

        assert_eq!(items[0], Value::Null);
        assert_eq!(items[1], Value::Bool(true));
        assert_eq!(items[2], Value::Int(9_007_199_254_740_993));
        assert_eq!(items[3], Value::Float(1.5));
        assert_eq!(items[4], Value::Float(f64::INFINITY));
        assert_eq!(items[5], Value::string("~tilde"));
        assert_eq!(items[6], Value::string("^caret"));
        assert_eq!(
            items[7],
            Value::Uuid(Uuid::parse_str("5e3dc3c2-7f7c-4b1b-9d0a-1f2c3b4a5d6e").unwrap())
        );
        assert_eq!(items[8], items[9]);
        assert_eq!(items[10], Value::symbol("run/cancel"));
        assert_eq!(
            items[11],
            Value::Extension {
                tag: 'r',
                rep: "https://circleci.com".into()
            }
        );
    }

    #[test]
    fn test_decode_quoted_top_level_scalar() {
        assert_eq!(decode(r#"["~#'","hello"]"#).unwrap(), Value::string("hello"));
    }

    #[test]
    fn test_decode_uuid_from_halves() {
        let expected = Uuid::parse_str("5e3dc3c2-7f7c-4b1b-9d0a-1f2c3b4a5d6e").unwrap();
        let (high, low) = expected.as_u64_pair();
        let text = format!(r#"["~#u",[{},{}]]"#, high as i64, low as i64);
        assert_eq!(decode(&text).unwrap(), Value::Uuid(expected));
    }

    #[test]
    fn test_decode_composite_map_keys() {
        let value = decode(r#"["~#cmap",[["^ ","~:a",1],"first",["~#list",[1]],"second"]]"#).unwrap();
        let map = value.as_map().unwrap();

        assert_eq!(
            map.get(&Value::List(vec![Value::Int(1)])),
            Some(&Value::string("second"))
        );
    }

    #[test]
    fn test_decode_verbose_object() {
        let value = decode(r#"{"~:results":[{"~:workflow/name":"build"}]}"#).unwrap();
        let results = value.as_map().unwrap().get_by_name("results").unwrap();
        let first = results.as_seq().unwrap()[0].as_map().unwrap();
        assert_eq!(first.get_by_name("workflow/name"), Some(&Value::string("build")));
    }

    #[test]
    fn test_malformed_envelopes() {
        let cases = [
            "not json",
            r#"["^ ","~:a"]"#,
            r#"["^0"]"#,
            r#"["~#list",1]"#,
            r#"["~#list",[],[]]"#,
            r#"["~"]"#,
            r#"["~?x"]"#,
            r#"["~unot-a-uuid"]"#,
            r#"["~mlater"]"#,
            r#"["~#u",[1]]"#,
            r#"["^ ","~#list",1]"#,
        ];

        for case in cases {
            let result = decode(case);
            assert!(
                matches!(result, Err(TransitError::MalformedEnvelope(_))),
                "expected {case} to be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn test_cache_index_codes() {
        assert_eq!(cache_index("^0"), Some(0));
        assert_eq!(cache_index("^["), Some(43));
        assert_eq!(cache_index("^10"), Some(44));
        assert_eq!(cache_index("^"), None);
        assert_eq!(cache_index("^000"), None);
    }
}
