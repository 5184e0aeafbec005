use indoc::indoc;
use luapack_core::diagnostics::CollectingDiagnosticHandler;
use luapack_core::{Bundler, BundlerOptions, MockFileSystem};
use luapack_test_helpers::fixtures::{
    chain_tree, cycle_tree, diamond_tree, package_tree, published_cycle_tree,
};
use luapack_test_helpers::{eval_bundle, eval_native, ModuleTree};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn bundle_tree(tree: &ModuleTree, options: BundlerOptions) -> String {
    Bundler::new(options)
        .bundle(&tree.path("main.lua"))
        .expect("bundle failed")
}

#[test]
fn test_chain_returns_same_value_as_native() {
    let tree = chain_tree();
    let output = bundle_tree(&tree, BundlerOptions::default());

    assert_eq!(eval_bundle(&output).unwrap(), "42");
    assert_eq!(eval_native(tree.root(), "main").unwrap(), "42");
}

#[test]
fn test_bundle_runs_without_search_path() {
    let tree = chain_tree();
    let output = bundle_tree(&tree, BundlerOptions::default());
    drop(tree);

    // The module files are gone, so only the bundle itself can answer
    assert_eq!(eval_bundle(&output).unwrap(), "42");
}

#[test]
fn test_shared_module_loads_once() {
    let tree = diamond_tree();
    let output = bundle_tree(&tree, BundlerOptions::default());

    let expected = r#"{"loads"=1,"same"=true}"#;
    assert_eq!(eval_bundle(&output).unwrap(), expected);
    assert_eq!(eval_native(tree.root(), "main").unwrap(), expected);
    assert_eq!(output.matches("__define(\"shared\"").count(), 1);
}

#[test]
fn test_cycle_terminates_with_nil_partial_value() {
    let tree = cycle_tree();
    let output = bundle_tree(&tree, BundlerOptions::default());

    assert_eq!(eval_bundle(&output).unwrap(), r#""a:nil""#);
}

#[test]
fn test_cycle_sees_exports_published_through_package_loaded() {
    let tree = published_cycle_tree();
    let output = bundle_tree(&tree, BundlerOptions::default());

    assert_eq!(eval_native(tree.root(), "main").unwrap(), r#""a:a""#);
    assert_eq!(
        eval_bundle(&output).unwrap(),
        eval_native(tree.root(), "main").unwrap()
    );
}

#[test]
fn test_loader_returning_nothing_keeps_published_exports() {
    let tree = ModuleTree::new()
        .with(
            "main.lua",
            indoc! {r#"
                local first = require("config")
                local second = require("config")
                return { port = first.port, same = first == second, cached = package.loaded.config == first }
            "#},
        )
        .with(
            "config.lua",
            indoc! {r#"
                local M = { port = 8080 }
                package.loaded[...] = M
            "#},
        );
    let output = bundle_tree(&tree, BundlerOptions::default());

    let expected = r#"{"cached"=true,"port"=8080,"same"=true}"#;
    assert_eq!(eval_native(tree.root(), "main").unwrap(), expected);
    assert_eq!(eval_bundle(&output).unwrap(), expected);
}

#[test]
fn test_host_package_loaded_entry_is_not_mistaken_for_exports() {
    let tree = ModuleTree::new()
        .with("main.lua", "local s = require('./string')\nreturn { s = s, host = package.loaded.string == string }\n")
        .with("string.lua", "return 'bundled'\n");
    let output = bundle_tree(&tree, BundlerOptions::default());

    assert_eq!(
        eval_bundle(&output).unwrap(),
        r#"{"host"=true,"s"="bundled"}"#
    );
}

#[test]
fn test_dotted_and_init_modules_match_native() {
    let tree = package_tree();
    let options = BundlerOptions {
        search_paths: vec![PathBuf::from(".")],
        ..Default::default()
    };
    let output = bundle_tree(&tree, options);

    assert!(output.contains("__define(\"lib/util\""));
    assert!(output.contains("__define(\"shapes/init\""));
    assert_eq!(
        eval_bundle(&output).unwrap(),
        eval_native(tree.root(), "main").unwrap()
    );
}

#[test]
fn test_dotted_name_of_package_directory_matches_native() {
    let tree = ModuleTree::new()
        .with("main.lua", "return require('lib.pkg').name\n")
        .with("lib/pkg/init.lua", "return { name = 'pkg' }\n");
    let output = bundle_tree(&tree, BundlerOptions::default());

    assert!(output.contains("__define(\"lib/pkg/init\""));
    assert_eq!(eval_bundle(&output).unwrap(), r#""pkg""#);
    assert_eq!(eval_native(tree.root(), "main").unwrap(), r#""pkg""#);
}

#[test]
fn test_two_spellings_of_one_file_load_once() {
    let tree = ModuleTree::new()
        .with(
            "main.lua",
            indoc! {r#"
                local a = require("./lib/counter")
                local b = require("lib/../lib/counter.lua")
                return { loads = loads, same = a == b }
            "#},
        )
        .with(
            "lib/counter.lua",
            indoc! {r#"
                loads = (loads or 0) + 1
                return {}
            "#},
        );
    let output = bundle_tree(&tree, BundlerOptions::default());

    assert_eq!(output.matches("-- Module: ").count(), 2);
    assert_eq!(eval_bundle(&output).unwrap(), r#"{"loads"=1,"same"=true}"#);
}

#[test]
fn test_output_is_deterministic() {
    let tree = diamond_tree();
    let first = bundle_tree(&tree, BundlerOptions::default());
    let second = bundle_tree(&tree, BundlerOptions::default());
    assert_eq!(first, second);
}

#[test]
fn test_non_reference_bytes_are_preserved() {
    let odd = "-- comment naming require('ghost')\nlocal s = \"require('y')\"  \t\r\nlocal t = [==[\n ]] require 'z' ]==]\n\n\nreturn s .. t\n";
    let tree = ModuleTree::new()
        .with("main.lua", "return require('./odd')\n")
        .with("odd.lua", odd);
    let output = bundle_tree(&tree, BundlerOptions::default());

    assert!(output.contains(odd));
    assert_eq!(
        eval_bundle(&output).unwrap(),
        r#""require('y') ]] require 'z' ""#
    );
}

#[test]
fn test_module_return_values_and_nil() {
    let tree = ModuleTree::new()
        .with(
            "main.lua",
            indoc! {r#"
                local first = require("./silent")
                local second = require("./silent")
                return { first = first, second = second, runs = runs }
            "#},
        )
        .with("silent.lua", "runs = (runs or 0) + 1\n");
    let output = bundle_tree(&tree, BundlerOptions::default());

    assert_eq!(
        eval_bundle(&output).unwrap(),
        r#"{"first"=true,"runs"=1,"second"=true}"#
    );
}

#[test]
fn test_loader_receives_module_id_and_filename() {
    let tree = ModuleTree::new()
        .with("main.lua", "return require('./lib/name')\n")
        .with("lib/name.lua", "return { name = select(1, ...), file = select(2, ...) }\n");
    let output = bundle_tree(&tree, BundlerOptions::default());

    assert_eq!(
        eval_bundle(&output).unwrap(),
        r#"{"file"="lib/name.lua","name"="lib/name"}"#
    );
}

#[test]
fn test_external_require_is_left_to_host() {
    let tree = ModuleTree::new()
        .with("main.lua", "local json = require('json')\nreturn json.name\n");
    let options = BundlerOptions {
        externals: vec!["json".to_string()],
        ..Default::default()
    };
    let output = bundle_tree(&tree, options);

    assert!(output.contains("local json = require('json')"));
    let with_host = format!(
        "package.preload.json = function() return {{ name = 'host json' }} end\n{}",
        output
    );
    assert_eq!(eval_bundle(&with_host).unwrap(), r#""host json""#);
}

#[test]
fn test_non_utf8_module_names_file_and_reason() {
    let tree = ModuleTree::new().with("main.lua", "return require('./latin')\n");
    std::fs::write(tree.path("latin.lua"), b"-- caf\xe9\nreturn 1\n").unwrap();

    let err = Bundler::new(BundlerOptions::default())
        .bundle(&tree.path("main.lua"))
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("latin.lua"), "{}", message);
    assert!(message.contains("UTF-8"), "{}", message);
}

#[test]
fn test_bundle_snapshot() {
    let mut fs = MockFileSystem::new();
    fs.add_file(
        "/proj/main.lua",
        "local greet = require('./util/greet')\nreturn greet('world')\n",
    );
    fs.add_file(
        "/proj/util/greet.lua",
        "local fmt = require(\"./fmt\")\nreturn function(name) return fmt.wrap(name) end\n",
    );
    fs.add_file(
        "/proj/util/fmt.lua",
        "return { wrap = function(s) return '<' .. s .. '>' end }",
    );

    let bundler = Bundler::with_dependencies(
        BundlerOptions::default(),
        Arc::new(CollectingDiagnosticHandler::new()),
        Arc::new(fs),
    );
    let output = bundler.bundle(Path::new("/proj/main.lua")).unwrap();

    assert_eq!(eval_bundle(&output).unwrap(), r#""<world>""#);
    insta::assert_snapshot!("nested_modules", output);
}
