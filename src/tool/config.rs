use crate::{dbs, schema::AttrIndex, Error, Result};

/// Default limit on IDL-cache memory, counted in blocks of
/// [IDBLOCK][crate::tool::IDBLOCK] ids. Zero disables caching and
/// forces direct writes to the secondary databases.
pub const IDL_CACHE_MAX_SIZE: usize = 8 * 1024;

/// Default posting count beyond which an index key switches from a
/// duplicate list to the compact `[0, first, last]` range form.
pub const IDL_DB_SIZE: usize = 1 << 16;

/// Configuration for a [Session][crate::tool::Session].
#[derive(Clone, Debug)]
pub struct Config {
    /// Uniquely name this backend.
    pub name: String,
    /// Canonical root of the tree this backend owns.
    pub suffix: String,
    /// Indexed attributes, one secondary database each.
    pub attrs: Vec<AttrIndex>,
    /// Index one attribute per scan of the primary store.
    ///
    /// Default: false
    pub linear_index: bool,
    /// IDL cache limit in blocks, 0 to disable caching.
    ///
    /// Default: [IDL_CACHE_MAX_SIZE]
    pub idl_cache_max_size: usize,
    /// List to range threshold for a single index key.
    ///
    /// Default: [IDL_DB_SIZE]
    pub idl_db_size: usize,
    /// Worker pool size, including the producer slice.
    ///
    /// Default: `num_cpus::get()`
    pub thread_max: usize,
    /// Bypass transactions for speed.
    ///
    /// Default: false
    pub quick: bool,
    /// Open the store read-only; disables the worker pool.
    ///
    /// Default: false
    pub readonly: bool,
}

impl Config {
    pub fn new(name: &str, suffix: &str) -> Config {
        Config {
            name: name.to_string(),
            suffix: dbs::to_canonical(suffix),
            attrs: Vec::default(),
            linear_index: false,
            idl_cache_max_size: IDL_CACHE_MAX_SIZE,
            idl_db_size: IDL_DB_SIZE,
            thread_max: num_cpus::get(),
            quick: false,
            readonly: false,
        }
    }

    pub fn set_attrs(&mut self, attrs: Vec<AttrIndex>) -> &mut Self {
        self.attrs = attrs;
        self
    }

    pub fn set_linear_index(&mut self, linear_index: bool) -> &mut Self {
        self.linear_index = linear_index;
        self
    }

    pub fn set_idl_cache_max_size(&mut self, max_size: usize) -> &mut Self {
        self.idl_cache_max_size = max_size;
        self
    }

    pub fn set_idl_db_size(&mut self, db_size: usize) -> &mut Self {
        self.idl_db_size = db_size;
        self
    }

    pub fn set_thread_max(&mut self, thread_max: usize) -> &mut Self {
        self.thread_max = thread_max;
        self
    }

    pub fn set_quick(&mut self, quick: bool) -> &mut Self {
        self.quick = quick;
        self
    }

    pub fn set_readonly(&mut self, readonly: bool) -> &mut Self {
        self.readonly = readonly;
        self
    }

    /// Load configuration from toml text. `name` and `suffix` are
    /// required, everything else falls back to defaults.
    pub fn from_toml(text: &str) -> Result<Config> {
        let value: toml::Value = err_at!(FailConvert, text.parse())?;

        let name = match value.get("name").and_then(|v| v.as_str()) {
            Some(name) => name,
            None => return err_at!(InvalidInput, msg: "config missing `name`"),
        };
        let suffix = match value.get("suffix").and_then(|v| v.as_str()) {
            Some(suffix) => suffix,
            None => return err_at!(InvalidInput, msg: "config missing `suffix`"),
        };

        let mut config = Config::new(name, suffix);

        if let Some(items) = value.get("attrs").and_then(|v| v.as_array()) {
            let mut attrs = vec![];
            for item in items.iter() {
                match item.as_str() {
                    Some(desc) => attrs.push(AttrIndex::new(desc)),
                    None => return err_at!(InvalidInput, msg: "attrs must be strings"),
                }
            }
            config.set_attrs(attrs);
        }
        if let Some(v) = value.get("linear_index").and_then(|v| v.as_bool()) {
            config.set_linear_index(v);
        }
        if let Some(v) = value.get("idl_cache_max_size").and_then(|v| v.as_integer()) {
            config.set_idl_cache_max_size(v as usize);
        }
        if let Some(v) = value.get("idl_db_size").and_then(|v| v.as_integer()) {
            config.set_idl_db_size(v as usize);
        }
        if let Some(v) = value.get("thread_max").and_then(|v| v.as_integer()) {
            config.set_thread_max(v as usize);
        }
        if let Some(v) = value.get("quick").and_then(|v| v.as_bool()) {
            config.set_quick(v);
        }
        if let Some(v) = value.get("readonly").and_then(|v| v.as_bool()) {
            config.set_readonly(v);
        }

        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
