// i18n.rs
//
// Runtime UI strings:
// - English is embedded (assets/i18n/en.json) and is always the fallback
// - Other languages load from <exe_dir>/assets/i18n/<lang>.json or ./assets/i18n/<lang>.json
// - Lookup: tr("key") / tr_with("key", &[("name", ...)]) with {name} placeholders

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

const FALLBACK_LANG: &str = "en";
const EMBEDDED_EN: &str = include_str!("../assets/i18n/en.json");

/// Languages the Language menu offers: (code, native name).
pub const LANGUAGES: [(&str, &str); 2] = [("en", "English"), ("zh-Hans", "简体中文")];

#[derive(Debug, Clone)]
pub struct I18n {
    pub lang: String,
    map: HashMap<String, String>,
    fallback_map: HashMap<String, String>,
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

fn load_json_map(path: &Path) -> Option<HashMap<String, String>> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("ignoring malformed string table {}: {}", path.display(), e);
            None
        }
    }
}

fn embedded_fallback() -> HashMap<String, String> {
    serde_json::from_str(EMBEDDED_EN).unwrap_or_default()
}

/// Find assets/i18n/<lang>.json next to the executable, then in the working directory.
fn find_lang_file(lang: &str) -> Option<PathBuf> {
    let file = format!("{}.json", lang);

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join("i18n").join(&file);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join("i18n").join(&file);
    if p.exists() {
        return Some(p);
    }

    None
}

fn load_lang(lang: &str) -> HashMap<String, String> {
    if let Some(m) = find_lang_file(lang).and_then(|p| load_json_map(&p)) {
        return m;
    }
    if lang == FALLBACK_LANG {
        return embedded_fallback();
    }
    log::warn!("no string table for language {:?}, using {}", lang, FALLBACK_LANG);
    HashMap::new()
}

/// Initialize global i18n. Safe to call multiple times; later calls replace the tables.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();
    let map = load_lang(&lang);
    let i = I18n {
        lang,
        map,
        fallback_map: embedded_fallback(),
    };

    if let Some(lock) = I18N.get() {
        if let Ok(mut w) = lock.write() {
            *w = i;
        }
    } else {
        let _ = I18N.set(RwLock::new(i));
    }
}

fn get_locked() -> Option<std::sync::RwLockReadGuard<'static, I18n>> {
    I18N.get().and_then(|l| l.read().ok())
}

/// Get localized text by key. If key missing, returns key itself.
pub fn tr(key: &str) -> String {
    let Some(i) = get_locked() else {
        return key.to_string();
    };

    if let Some(v) = i.map.get(key) {
        return v.clone();
    }
    if let Some(v) = i.fallback_map.get(key) {
        return v.clone();
    }
    key.to_string()
}

/// Get localized text and substitute `{name}` placeholders.
/// Any placeholder not provided is kept as-is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    substitute(tr(key), args)
}

fn substitute(mut s: String, args: &[(&str, String)]) -> String {
    for (k, v) in args {
        let placeholder = format!("{{{}}}", k);
        s = s.replace(&placeholder, v);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses() {
        let map = embedded_fallback();
        assert!(map.contains_key("app.title"));
    }

    #[test]
    fn placeholders_are_replaced() {
        let s = substitute(
            "{n} lights in {path}".to_string(),
            &[("n", "3".to_string())],
        );
        assert_eq!(s, "3 lights in {path}");
    }
}
