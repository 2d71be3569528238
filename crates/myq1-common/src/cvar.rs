// cvar.rs -- dynamic variable tracking

use crate::common::com_printf;

use parking_lot::Mutex;
use std::collections::HashMap;

pub const CVAR_ARCHIVE: i32 = 1; // set to cause it to be saved to config
pub const CVAR_NOSET: i32 = 8; // don't allow change from console at all

/// A console variable.
#[derive(Clone, Debug)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub flags: i32,
    pub modified: bool,
    pub value: f32,
}

/// The cvar table.
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
}

fn parse_value(s: &str) -> f32 {
    s.trim().parse::<f32>().unwrap_or(0.0)
}

impl CvarContext {
    pub fn new() -> Self {
        Self {
            cvar_vars: Vec::new(),
            cvar_index: HashMap::new(),
        }
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |v| v.value)
    }

    /// Get the string value of a cvar. Returns "" if not found.
    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |v| v.string.as_str())
    }

    /// Get or create a cvar. An existing cvar keeps its value; flags are OR'd in.
    pub fn get(&mut self, name: &str, value: &str, flags: i32) -> usize {
        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return idx;
        }

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            flags,
            modified: true,
            value: parse_value(value),
        });
        self.cvar_index.insert(name.to_string(), idx);
        idx
    }

    /// Set a cvar value (respects NOSET).
    pub fn set(&mut self, name: &str, value: &str) -> usize {
        let idx = match self.cvar_index.get(name) {
            Some(&idx) => idx,
            None => return self.get(name, value, 0),
        };

        let var = &mut self.cvar_vars[idx];
        if var.flags & CVAR_NOSET != 0 {
            com_printf(&format!("{} is write protected.\n", name));
            return idx;
        }
        if var.string == value {
            return idx;
        }

        var.modified = true;
        var.string = value.to_string();
        var.value = parse_value(value);
        idx
    }

    /// Set a cvar from a float value.
    pub fn set_value(&mut self, name: &str, value: f32) -> usize {
        let val_str = if value == (value as i32) as f32 {
            format!("{}", value as i32)
        } else {
            format!("{}", value)
        };
        self.set(name, &val_str)
    }

}

impl Default for CvarContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Global singleton and free-function wrappers
// ============================================================

static CVAR_CTX: Mutex<Option<CvarContext>> = parking_lot::const_mutex(None);

/// Registers the cvars the world code reads.
pub fn cvar_init() {
    let mut g = CVAR_CTX.lock();
    let ctx = g.get_or_insert_with(CvarContext::new);
    ctx.get("developer", "0", 0);
    ctx.get("hardfail", "0", CVAR_ARCHIVE);
}

/// Access the global cvar table, creating it on first use.
pub fn with_cvar_ctx<F, R>(f: F) -> R
where
    F: FnOnce(&mut CvarContext) -> R,
{
    let mut g = CVAR_CTX.lock();
    f(g.get_or_insert_with(CvarContext::new))
}

pub fn cvar_set(name: &str, value: &str) {
    with_cvar_ctx(|c| c.set(name, value));
}

pub fn cvar_set_value(name: &str, value: f32) {
    with_cvar_ctx(|c| c.set_value(name, value));
}

pub fn cvar_variable_value(name: &str) -> f32 {
    CVAR_CTX.lock().as_ref().map_or(0.0, |c| c.variable_value(name))
}
