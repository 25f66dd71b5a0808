mod app;
mod export;
mod model;
mod signature;

use clap::{Parser, Subcommand};
use directories::{BaseDirs, ProjectDirs};
use eframe::egui;
use inquire::Text;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::model::CompanyProfile;

// ==========================================
// Constants & Embeds
// ==========================================

// Embed the default company profile so first runs work without setup
const DEFAULT_SENDER_TEMPLATE: &str = include_str!("../sender.toml");

// ==========================================
// Structs & Enums
// ==========================================

#[derive(Debug, Serialize, Deserialize)]
struct AppSettings {
    data_root: String,
}

#[derive(Parser)]
#[command(name = "invoice-pad")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure data directory
    Config,
    /// Open output folder
    Open,
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // 1. Initialize configuration
    let settings = load_settings().unwrap_or_else(|| setup_config_wizard());
    let expanded_path = expand_home_dir(&settings.data_root);
    let root = PathBuf::from(expanded_path);

    if let Err(e) = fs::create_dir_all(root.join("output")) {
        eprintln!("❌ Error: Failed to create output directory: {}", e);
        return;
    }

    match cli.command {
        None => {
            let profile = load_company_profile(&root);
            launch_form(root, profile);
        }
        Some(Commands::Config) => {
            setup_config_wizard();
        }
        Some(Commands::Open) => {
            open_output_folder(&root);
        }
    }
}

// ==========================================
// 1. Form Launch
// ==========================================

fn launch_form(root: PathBuf, profile: CompanyProfile) {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([980.0, 860.0])
            .with_title("Invoice Pad"),
        ..Default::default()
    };
    let result = eframe::run_native(
        "invoice-pad",
        options,
        Box::new(move |cc| Ok(Box::new(app::InvoicePadApp::new(cc, root, profile)))),
    );
    if let Err(e) = result {
        eprintln!("❌ Error: Failed to start the invoice form: {}", e);
    }
}

// ==========================================
// 2. Config & Utilities
// ==========================================

fn get_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "invoice-pad", "app") {
        let config_dir = proj_dirs.config_dir();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).ok();
        }
        return config_dir.join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

fn load_settings() -> Option<AppSettings> {
    let path = get_config_path();
    if !path.exists() {
        return None;
    }
    let content = fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

fn setup_config_wizard() -> AppSettings {
    println!("\n⚙️  --- Configuration Setup ---");
    let current = load_settings();
    let default_val = current
        .map(|s| s.data_root)
        .unwrap_or_else(|| "~/Documents/Invoices".to_string());

    println!("📂 Opening folder picker...");
    let picked_path = rfd::FileDialog::new()
        .set_title("Select Root Data Directory")
        .pick_folder();

    let new_root = if let Some(path) = picked_path {
        path.to_string_lossy().to_string()
    } else {
        println!("❌ No folder selected. Falling back to manual input.");
        match Text::new("Enter Root Data Directory:")
            .with_default(&default_val)
            .prompt()
        {
            Ok(v) => v,
            Err(_) => default_val,
        }
    };

    let settings = AppSettings {
        data_root: new_root,
    };

    let path = get_config_path();
    match toml::to_string_pretty(&settings) {
        Ok(toml_str) => {
            if let Err(e) = fs::write(&path, toml_str) {
                eprintln!("❌ Error: Failed to save settings: {}", e);
            } else {
                println!("✅ Settings saved.");
            }
        }
        Err(e) => eprintln!("❌ Error: Failed to serialize settings: {}", e),
    }
    settings
}

fn load_company_profile(root: &Path) -> CompanyProfile {
    let path = root.join("sender.toml");
    if path.exists() {
        match fs::read_to_string(&path).map_err(|e| e.to_string()).and_then(|content| {
            toml::from_str::<CompanyProfile>(&content).map_err(|e| e.to_string())
        }) {
            Ok(profile) => return profile,
            Err(e) => {
                eprintln!("⚠️  Could not read {}: {} — using defaults.", path.display(), e);
            }
        }
    } else {
        println!("✨ Initializing default company profile...");
        if let Err(e) = fs::write(&path, DEFAULT_SENDER_TEMPLATE) {
            eprintln!("⚠️  Failed to write sender.toml: {}", e);
        }
    }
    toml::from_str(DEFAULT_SENDER_TEMPLATE).expect("embedded sender.toml is invalid")
}

fn expand_home_dir(path: &str) -> String {
    if path.starts_with("~") {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen("~", &home, 1);
        }
    }
    path.to_string()
}

// Helper: open the output folder with the platform opener
fn open_output_folder(root: &Path) {
    let target = root.join("output");
    println!("🚀 Opening: {:?}", target);

    #[cfg(target_os = "macos")]
    Command::new("open").arg(&target).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(&target).spawn().ok();

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(&target).spawn().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_company_profile_parses() {
        let profile: CompanyProfile =
            toml::from_str(DEFAULT_SENDER_TEMPLATE).expect("embedded sender.toml parses");
        assert_eq!(profile.sender.name, "N.M Engineering Works");
        assert_eq!(profile.bill_to.place_of_supply, "27-Maharashtra");
    }

    #[test]
    fn home_expansion_leaves_absolute_paths_alone() {
        assert_eq!(expand_home_dir("/data/invoices"), "/data/invoices");
    }
}
