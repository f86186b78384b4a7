use serde::{Deserialize, Serialize};

/// Which family of buckets a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Word-like terms, keyed by their comma-joined stems.
    Stemmed,
    /// Everything else, keyed by the lowercased raw term and matched as a
    /// substring.
    Raw,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Stemmed => "stemmed",
            Namespace::Raw => "raw",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one bucket. Its display form doubles as the term key the usage
/// ledger tracks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub namespace: Namespace,
    pub key: String,
}

impl BucketKey {
    pub fn stemmed(key: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Stemmed,
            key: key.into(),
        }
    }

    pub fn raw(key: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Raw,
            key: key.into(),
        }
    }

    /// Parse the display form (`stemmed:<key>` / `raw:<key>`).
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(key) = s.strip_prefix("stemmed:") {
            Some(Self::stemmed(key))
        } else {
            s.strip_prefix("raw:").map(Self::raw)
        }
    }

    /// Stems of a stemmed key; empty for raw keys.
    pub fn stems(&self) -> Vec<&str> {
        match self.namespace {
            Namespace::Stemmed => self.key.split(',').collect(),
            Namespace::Raw => Vec::new(),
        }
    }

    pub fn term_key(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}

/// One learned (trigger → response) association. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermRecord {
    pub term: String,
    pub response: String,
    pub stems: Vec<String>,
    pub stem_key: String,
}

impl TermRecord {
    pub fn namespace(&self) -> Namespace {
        if self.stems.is_empty() {
            Namespace::Raw
        } else {
            Namespace::Stemmed
        }
    }

    pub fn bucket_key(&self) -> BucketKey {
        BucketKey {
            namespace: self.namespace(),
            key: self.stem_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(term: &str, stems: &[&str], key: &str) -> TermRecord {
        TermRecord {
            term: term.into(),
            response: "r".into(),
            stems: stems.iter().map(|s| s.to_string()).collect(),
            stem_key: key.into(),
        }
    }

    #[test]
    fn namespace_follows_stems() {
        assert_eq!(record("Dogs", &["dog"], "dog").namespace(), Namespace::Stemmed);
        assert_eq!(record("!!!", &[], "!!!").namespace(), Namespace::Raw);
    }

    #[test]
    fn bucket_key_display_and_parse() {
        let key = record("foo bar", &["foo", "bar"], "foo,bar").bucket_key();
        assert_eq!(key.to_string(), "stemmed:foo,bar");
        assert_eq!(BucketKey::parse("stemmed:foo,bar"), Some(key));
        assert_eq!(BucketKey::parse("raw::-)"), Some(BucketKey::raw(":-)")));
        assert_eq!(BucketKey::parse("other:x"), None);
    }

    #[test]
    fn stems_of_keys() {
        assert_eq!(BucketKey::stemmed("foo,bar").stems(), vec!["foo", "bar"]);
        assert!(BucketKey::raw("a,b").stems().is_empty());
    }

    #[test]
    fn ordering_groups_namespaces() {
        let mut keys = vec![
            BucketKey::raw("b"),
            BucketKey::stemmed("z"),
            BucketKey::stemmed("a"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![BucketKey::stemmed("a"), BucketKey::stemmed("z"), BucketKey::raw("b")]
        );
    }

    #[test]
    fn record_serializes() {
        let r = record("Hello", &["hello"], "hello");
        let json = serde_json::to_string(&r).unwrap();
        let back: TermRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
