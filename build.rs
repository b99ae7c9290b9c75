use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use syntect::dumps::dump_to_uncompressed_file;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, css_for_theme_with_class_style};
use two_face::syntax;
use walkdir::WalkDir;

fn main() {
    prepare_assets().expect("failed to prepare static site assets");

    let static_dir = Path::new("static");
    let templates_dir = Path::new("templates");

    println!("cargo:rerun-if-changed={}", static_dir.display());
    println!("cargo:rerun-if-changed={}", templates_dir.display());

    for dir in [static_dir, templates_dir] {
        if dir.is_dir() {
            for entry in WalkDir::new(dir).into_iter().flatten() {
                println!("cargo:rerun-if-changed={}", entry.path().display());
            }
        }
    }
}

fn prepare_assets() -> Result<(), String> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(|err| err.to_string())?);
    write_site_stylesheet(&out_dir)?;
    write_syntax_pack(&out_dir)
}

fn write_site_stylesheet(out_dir: &Path) -> Result<(), String> {
    let base_path = Path::new("static").join("site.css");
    let base_css = fs::read_to_string(&base_path)
        .map_err(|err| format!("failed to read {}: {err}", base_path.display()))?;
    let theme_css = render_theme_css()?;

    let mut combined = String::with_capacity(base_css.len() + theme_css.len() + 200);
    combined.push_str(base_css.trim_end());
    combined.push_str(
        "\n\n/* --- Syntect theme (base16-ocean.light), generated at build time --- */\n",
    );
    combined.push_str(&theme_css);
    combined.push('\n');

    let dest = out_dir.join("site.css");
    fs::write(&dest, combined).map_err(|err| format!("failed to write {}: {err}", dest.display()))?;
    println!("cargo:rustc-env=SITE_CSS_FILE={}", dest.display());

    Ok(())
}

fn render_theme_css() -> Result<String, String> {
    let theme_set = ThemeSet::load_defaults();
    let theme = theme_set
        .themes
        .get("base16-ocean.light")
        .ok_or_else(|| "theme `base16-ocean.light` not found".to_string())?;

    css_for_theme_with_class_style(theme, ClassStyle::SpacedPrefixed { prefix: "syntax-" })
        .map_err(|err| err.to_string())
}

fn write_syntax_pack(out_dir: &Path) -> Result<(), String> {
    let syntax_set = syntax::extra_newlines();
    let pack_path = out_dir.join("syntaxes.packdump");
    dump_to_uncompressed_file(&syntax_set, &pack_path)
        .map_err(|err| format!("failed to encode syntax set: {err}"))?;

    println!("cargo:rustc-env=SYNTAX_PACK_FILE={}", pack_path.display());

    Ok(())
}
