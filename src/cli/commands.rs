//! CLI command implementations.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::generate::{generate_mapping, GenerateMode};
use crate::network::{self, Network};

use super::args::Commands;

/// Where the compiled index lives inside the langs directory.
const GENERATED_DIR: &str = "generated";

/// Execute a CLI command.
pub fn execute(command: Commands, langs_dir: Option<PathBuf>) -> Result<()> {
    let langs_dir = resolve_langs_dir(langs_dir);
    match command {
        Commands::Convert {
            in_lang,
            out_lang,
            text,
            alignment,
            stages,
        } => cmd_convert(&langs_dir, &in_lang, &out_lang, &text, alignment, stages),
        Commands::Update { out_dir } => cmd_update(&langs_dir, out_dir),
        Commands::Tokenize { lang, text } => cmd_tokenize(&langs_dir, &lang, &text),
        Commands::GenerateMapping {
            in_lang,
            out_lang,
            ipa,
            out_dir,
        } => cmd_generate(&langs_dir, &in_lang, &out_lang, ipa, out_dir),
        Commands::ShowMappings {
            in_lang,
            out_lang,
            verbose,
        } => cmd_show_mappings(&langs_dir, in_lang, out_lang, verbose),
    }
}

fn resolve_langs_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("G2P_LANGS_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("langs"))
}

fn load_network(langs_dir: &Path) -> Result<Network> {
    let index_dir = langs_dir.join(GENERATED_DIR);
    Ok(Network::load(&index_dir)
        .with_context(|| format!("no compiled index at {}; run `g2p update`", index_dir.display()))?)
}

fn cmd_convert(
    langs_dir: &Path,
    in_lang: &str,
    out_lang: &str,
    text: &str,
    show_alignment: bool,
    show_stages: bool,
) -> Result<()> {
    let network = load_network(langs_dir)?;
    let result = network.convert(text, in_lang, out_lang)?;

    println!("{}", result.output());
    if show_stages {
        for tier in result.tiers() {
            println!(
                "  {} {} {}",
                tier.input().dimmed(),
                "→".dimmed(),
                tier.output()
            );
        }
    }
    if show_alignment {
        for (input, output) in result.substring_alignments() {
            println!("  {} {} {}", input.cyan(), "→".dimmed(), output.green());
        }
    }
    Ok(())
}

fn cmd_update(langs_dir: &Path, out_dir: Option<PathBuf>) -> Result<()> {
    let out_dir = out_dir.unwrap_or_else(|| langs_dir.join(GENERATED_DIR));
    let network = network::rebuild(langs_dir, &out_dir)
        .with_context(|| format!("failed to rebuild index from {}", langs_dir.display()))?;
    println!(
        "{} {} mappings, {} notations",
        "compiled".green().bold(),
        network.mappings().len(),
        network.graph().nodes().len()
    );
    Ok(())
}

fn cmd_tokenize(langs_dir: &Path, lang: &str, text: &str) -> Result<()> {
    let network = load_network(langs_dir)?;
    for token in network.make_tokenizer(lang).tokenize(text) {
        let kind = if token.is_word {
            "word".green()
        } else {
            "other".dimmed()
        };
        println!("{}\t{:?}", kind, token.text);
    }
    Ok(())
}

fn cmd_generate(
    langs_dir: &Path,
    in_lang: &str,
    out_lang: &str,
    ipa: bool,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let network = load_network(langs_dir)?;
    let mode = if ipa {
        GenerateMode::Ipa
    } else {
        GenerateMode::Direct
    };
    let mapping = generate_mapping(&network, in_lang, out_lang, mode)?;

    let out_dir = out_dir.unwrap_or_else(|| langs_dir.join(GENERATED_DIR));
    let (config_path, rules_path) = write_generated(&mapping, &out_dir)?;
    println!(
        "{} {} rules: {} + {}",
        "generated".green().bold(),
        mapping.rules().len(),
        config_path.display(),
        rules_path.display()
    );
    Ok(())
}

/// Write a generated mapping as a rules file plus a one-mapping
/// configuration document.
fn write_generated(
    mapping: &crate::mappings::Mapping,
    out_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    let stem = format!("{}_to_{}", mapping.in_lang(), mapping.out_lang());
    let rules_path = out_dir.join(format!("{stem}.json"));
    let rules_json = serde_json::to_string_pretty(&mapping.source_rules())?;
    std::fs::write(&rules_path, rules_json)
        .with_context(|| format!("cannot write {}", rules_path.display()))?;

    let mut config = mapping.config().clone();
    config.rules_path = Some(PathBuf::from(format!("{stem}.json")));
    let document = crate::mappings::ConfigDocument {
        mappings: vec![config],
    };
    let config_path = out_dir.join(format!("config-{stem}.yaml"));
    let config_yaml = serde_yaml::to_string(&document)?;
    std::fs::write(&config_path, config_yaml)
        .with_context(|| format!("cannot write {}", config_path.display()))?;

    Ok((config_path, rules_path))
}

fn cmd_show_mappings(
    langs_dir: &Path,
    in_lang: Option<String>,
    out_lang: Option<String>,
    verbose: bool,
) -> Result<()> {
    let network = load_network(langs_dir)?;
    let mut shown = 0usize;
    for mapping in network.mappings() {
        if in_lang.as_deref().is_some_and(|l| l != mapping.in_lang()) {
            continue;
        }
        if out_lang.as_deref().is_some_and(|l| l != mapping.out_lang()) {
            continue;
        }
        shown += 1;
        let config = mapping.config();
        println!(
            "{} {} {} ({}, {} rules, {}, {})",
            mapping.in_lang().cyan(),
            "→".dimmed(),
            mapping.out_lang().cyan(),
            config.mapping_type,
            mapping.rules().len(),
            config.rule_ordering,
            config.norm_form,
        );
        if verbose {
            for rule in mapping.rules() {
                let source = rule.rule();
                println!(
                    "    {:?} → {:?} / {:?} _ {:?}",
                    source.rule_input,
                    source.rule_output,
                    source.context_before,
                    source.context_after
                );
            }
        }
    }
    if shown == 0 {
        println!("{}", "no matching mappings".yellow());
    }
    Ok(())
}
