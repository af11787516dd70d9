use serde_json::Value;
use std::collections::HashMap;

/// Reserved key of the values map holding the queued flash payloads.
pub const FLASH_KEY: &str = "_flash";

/// Per-store cookie options, copied into every session the store creates.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Cookie max-age in seconds. `<= 0` means "use the store's default
    /// record duration", not "no expiry".
    pub max_age_secs: i64,
    /// The cookie path attribute.
    pub path: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_age_secs: 86400,
            path: "/".to_string(),
        }
    }
}

/// Server-side state for one browser, referenced by a signed client-held
/// identifier.
///
/// Constructed transiently per request by the session store; persisted only
/// on an explicit save. `is_new` is `true` iff no id has been persisted for
/// this browser yet (no cookie, or cookie verification/expiry failed).
#[derive(Debug, Clone)]
pub struct Session {
    /// Random URL-safe identifier, assigned on first save; empty until then.
    pub id: String,
    /// The cookie name this session travels under.
    pub name: String,
    /// Application-defined values, serialized into the record on save.
    pub values: HashMap<String, Value>,
    /// Whether this session has ever been persisted for this browser.
    pub is_new: bool,
    /// Cookie options inherited from the store.
    pub options: SessionOptions,
}

impl Session {
    /// Creates a fresh, empty, unpersisted session.
    pub fn new(name: &str, options: SessionOptions) -> Self {
        Self {
            id: String::new(),
            name: name.to_string(),
            values: HashMap::new(),
            is_new: true,
            options,
        }
    }

    /// Inserts a value into the session map.
    pub fn insert(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the value stored under `key` as a string slice, if it is one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Appends a serialized flash payload to the flash queue.
    ///
    /// Multiple payloads may queue up before a save; they are drained
    /// one-per-call by [`pop_flash`](Session::pop_flash).
    pub fn push_flash(&mut self, payload: String) {
        let queue = self
            .values
            .entry(FLASH_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = queue {
            items.push(Value::String(payload));
        }
    }

    /// Pops the first queued flash payload, removing the queue key once it
    /// is empty. Returns `None` when nothing is queued.
    pub fn pop_flash(&mut self) -> Option<String> {
        let payload = match self.values.get_mut(FLASH_KEY) {
            Some(Value::Array(items)) if !items.is_empty() => match items.remove(0) {
                Value::String(s) => Some(s),
                _ => None,
            },
            _ => None,
        };
        let drained = matches!(
            self.values.get(FLASH_KEY),
            Some(Value::Array(items)) if items.is_empty()
        );
        if drained {
            self.values.remove(FLASH_KEY);
        }
        payload
    }
}
