// build.rs

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

type Translations = BTreeMap<String, String>;

fn main() {
    println!("cargo:rerun-if-env-changed=ATLASMAN_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    let lang = selected_language();
    println!("cargo:rustc-env=ATLASMAN_LANG_EFFECTIVE={}", lang);

    let mut translations = read_locale("en").expect("locales/en.toml is required");
    if lang != "en" {
        match read_locale(&lang) {
            Some(overrides) => translations.extend(overrides),
            None => println!(
                "cargo:warning=No locales/{}.toml; using the English strings.",
                lang
            ),
        }
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is always set by cargo");
    fs::write(
        Path::new(&out_dir).join("translations.rs"),
        render_macro(&translations),
    )
    .expect("Failed to write translations.rs");
}

/// A `lang_*` feature wins over `ATLASMAN_LANG`; the first feature alphabetically if several.
fn selected_language() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_LANG_")
                .map(str::to_lowercase)
        })
        .collect();
    features.sort();

    if let [first, _, ..] = features.as_slice() {
        println!(
            "cargo:warning=Several language features enabled ({:?}); using '{}'.",
            features, first
        );
    }
    features
        .into_iter()
        .next()
        .or_else(|| env::var("ATLASMAN_LANG").ok())
        .unwrap_or_else(|| "en".to_string())
}

/// `None` when the file is absent. A file that exists but does not parse fails the build.
fn read_locale(lang: &str) -> Option<Translations> {
    let path = format!("locales/{}.toml", lang);
    let content = fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(table) => Some(table),
        Err(e) => panic!("{} is not a flat table of strings: {}", path, e),
    }
}

/// One literal-producing arm per key, plus a catch-all that turns typos into compile errors.
fn render_macro(translations: &Translations) -> String {
    let mut code = String::from("#[macro_export]\nmacro_rules! t {\n");
    for (key, value) in translations {
        let literal = value.replace('\\', "\\\\").replace('"', "\\\"");
        code.push_str(&format!("    (\"{}\") => {{ \"{}\" }};\n", key, literal));
    }
    code.push_str(
        "    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n}\n",
    );
    code
}
