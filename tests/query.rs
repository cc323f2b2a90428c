// tests/query.rs

//! Listing, display and search queries

mod common;

use common::{add_fake, setup_context};
use pantry::{Config, Context, Recipe, Registry, Report, Request, execute};
use std::fs;
use std::path::Path;

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn single_report(request: Request, ctx: &mut Context) -> Report {
    let mut reports = execute(&request, ctx).unwrap();
    assert_eq!(reports.len(), 1);
    reports.remove(0)
}

#[test]
fn test_search_matches_query_words() {
    let (_temp, mut ctx) = setup_context();
    add_fake(&mut ctx, "ag", "Grep like tool optimized for speed");
    add_fake(&mut ctx, "vim", "The classic mode based terminal editor.");

    let report = single_report(Request::Search(words(&["vim"])), &mut ctx);
    assert_eq!(report, Report::Matches(words(&["vim"])));

    let report = single_report(
        Request::Search(words(&["EDITOR", "emacs", "grep"])),
        &mut ctx,
    );
    assert_eq!(report, Report::Matches(words(&["EDITOR", "grep"])));
}

#[test]
fn test_list_installed() {
    let (_temp, mut ctx) = setup_context();
    add_fake(&mut ctx, "ag", "Grep like tool optimized for speed");
    add_fake(&mut ctx, "vim", "The classic mode based terminal editor.");

    let empty = single_report(Request::ListInstalled, &mut ctx).to_string();
    assert_eq!(
        empty,
        "Installed Programs:\nProgram      | Date                | Hash or Version"
    );

    execute(&Request::Install(words(&["vim", "ag"])), &mut ctx).unwrap();
    let listing = single_report(Request::ListInstalled, &mut ctx).to_string();
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 4);

    // Ledger order is install order
    let date = ctx.ledger.get("vim").unwrap().date_display();
    assert_eq!(lines[2], format!("  vim        | {} | v1", date));
    assert!(lines[3].starts_with("  ag         | "));
}

#[test]
fn test_list_available() {
    let (_temp, mut ctx) = setup_context();
    add_fake(&mut ctx, "vim", "The classic mode based terminal editor.");
    add_fake(&mut ctx, "ag", "Grep like tool optimized for speed");

    let listing = single_report(Request::ListAvailable, &mut ctx).to_string();
    assert_eq!(
        listing,
        "Available Recipes:\n  ag: Grep like tool optimized for speed\n  \
         vim: The classic mode based terminal editor."
    );
}

#[test]
fn test_display_recipe() {
    let (_temp, mut ctx) = setup_context();
    add_fake(&mut ctx, "ag", "Grep like tool optimized for speed");

    let info = single_report(Request::Display(words(&["ag"])), &mut ctx).to_string();
    let lines: Vec<&str> = info.lines().collect();
    assert_eq!(
        lines,
        vec![
            "ag: Grep like tool optimized for speed",
            "  Homepage: https://example.com",
            "  Source: https://example.com/src",
            "  Current Repo: \"stable\"",
            "  Repo \"stable\": Dummy",
        ]
    );
}

#[test]
fn test_bundled_recipes_load() {
    let temp = tempfile::tempdir().unwrap();
    let config = Config::with_base(temp.path());
    let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join("recipes");

    let mut registry = Registry::new();
    let count = registry.index(&bundled, &config).unwrap();
    assert_eq!(count, 3);
    assert_eq!(registry.names(), vec!["ag", "libjsoncpp", "vim"]);

    let vim = registry.get("vim").unwrap();
    assert_eq!(vim.repo_label(), "stable");
    assert_eq!(vim.source(), "https://github.com/vim/vim");
    assert_eq!(vim.paths().install_dir, temp.path().join("builds/vim"));

    let mut ctx = Context::new(
        config.clone(),
        pantry::Ledger::open(&config.ledger_path()).unwrap(),
        registry,
    );
    let report = single_report(Request::Search(words(&["vim", "json"])), &mut ctx);
    assert_eq!(report, Report::Matches(words(&["vim", "json"])));
}

#[test]
fn test_init_registers_bundled_recipes() {
    let temp = tempfile::tempdir().unwrap();
    let config = Config::with_base(temp.path());
    config.ensure_dirs().unwrap();
    fs::write(
        config.paths.recipes.join("vim.toml"),
        "[package]\nname = \"vim\"\ndescription = \"Local vim\"\n\n[repos.stable]\nkind = \"dummy\"\n",
    )
    .unwrap();

    let ctx = Context::init(config).unwrap();
    assert_eq!(ctx.registry.names(), vec!["ag", "libjsoncpp", "vim"]);
    // The user's recipe directory overrides the bundled copy
    assert_eq!(ctx.registry.get("vim").unwrap().description(), "Local vim");
    assert_eq!(
        ctx.registry.get("ag").unwrap().description(),
        "Grep like tool optimized for speed"
    );
}
