//! The full load path: language folders on disk, compiled index,
//! conversion and tokenization through the network.

use std::fs;
use std::path::Path;

use libg2p::network;
use libg2p::prelude::*;
use tempfile::TempDir;

/// A miniature language tree: Danish over three hops plus Mohawk.
fn write_langs_tree(root: &Path) {
    let dan = root.join("dan");
    fs::create_dir_all(&dan).unwrap();
    fs::write(dan.join("rules.csv"), "hej,haj\nh,h\ne,ɛ\nj,j\n").unwrap();
    fs::write(dan.join("ipa_rules.csv"), "a,ɛ\nh,h\nj,j\n").unwrap();
    fs::write(dan.join("arpabet_rules.csv"), "h,HH\nɛ,EH\nj,Y\n").unwrap();
    fs::write(
        dan.join("config-g2p.yaml"),
        concat!(
            "mappings:\n",
            "  - in_lang: dan\n",
            "    out_lang: dan-ipa\n",
            "    rules_path: rules.csv\n",
            "  - in_lang: dan-ipa\n",
            "    out_lang: eng-ipa\n",
            "    rules_path: ipa_rules.csv\n",
            "  - in_lang: eng-ipa\n",
            "    out_lang: eng-arpabet\n",
            "    rules_path: arpabet_rules.csv\n",
            "    rule_ordering: apply-longest-first\n",
            "    out_delimiter: ' '\n",
        ),
    )
    .unwrap();

    let moh = root.join("moh");
    fs::create_dir_all(&moh).unwrap();
    fs::write(moh.join("rules.csv"), "',ʔ\nk,k\na,a\nn,n\ni,i\ne,e\né,é\nh,h\n").unwrap();
    fs::write(
        moh.join("config-g2p.yaml"),
        concat!(
            "mappings:\n",
            "  - in_lang: moh\n",
            "    out_lang: moh-ipa\n",
            "    rules_path: rules.csv\n",
        ),
    )
    .unwrap();
}

fn compiled_network(dir: &TempDir) -> Network {
    let out_dir = dir.path().join("generated");
    network::rebuild(dir.path(), &out_dir).unwrap();
    Network::load(&out_dir).unwrap()
}

#[test]
fn rebuild_load_convert() {
    let dir = TempDir::new().unwrap();
    write_langs_tree(dir.path());
    let network = compiled_network(&dir);

    assert_eq!(network.mappings().len(), 4);
    let result = network.convert("hej", "dan", "eng-arpabet").unwrap();
    assert_eq!(result.output(), "HH EH Y");
}

#[test]
fn moh_tokenizer_keeps_apostrophe_words_whole() {
    let dir = TempDir::new().unwrap();
    write_langs_tree(dir.path());
    let network = compiled_network(&dir);

    let tokens = network.make_tokenizer("moh").tokenize("Kanien'kéha");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].text, "Kanien'kéha");
    assert!(tokens[0].is_word);
}

#[test]
fn default_tokenizer_splits_apostrophe_words() {
    let dir = TempDir::new().unwrap();
    write_langs_tree(dir.path());
    let network = compiled_network(&dir);

    // eng has no mappings, so the default Unicode tokenizer applies.
    let tokens = network.make_tokenizer("eng").tokenize("Kanien'kéha");
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["Kanien", "'", "kéha"]);
}

#[test]
fn no_path_between_islands() {
    let dir = TempDir::new().unwrap();
    write_langs_tree(dir.path());
    let network = compiled_network(&dir);

    let err = network.convert("hej", "dan", "moh-ipa").unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn unknown_lang_fails_lookup() {
    let dir = TempDir::new().unwrap();
    write_langs_tree(dir.path());
    let network = compiled_network(&dir);

    assert!(network.convert("x", "dan", "klingon").is_err());
    assert!(network.descendants("klingon").is_err());
}

#[test]
fn descendants_reach_the_whole_chain() {
    let dir = TempDir::new().unwrap();
    write_langs_tree(dir.path());
    let network = compiled_network(&dir);

    let reachable = network.descendants("dan").unwrap();
    assert_eq!(
        reachable,
        vec![
            "dan-ipa".to_string(),
            "eng-ipa".to_string(),
            "eng-arpabet".to_string()
        ]
    );
}

#[test]
fn generated_mapping_round_trips_through_network() {
    let dir = TempDir::new().unwrap();
    write_langs_tree(dir.path());
    let mut network = compiled_network(&dir);

    let generated =
        generate_mapping(&network, "dan", "eng-arpabet", GenerateMode::Direct).unwrap();
    assert_eq!(generated.in_lang(), "dan");
    assert_eq!(generated.out_lang(), "eng-arpabet");
    network.add_mapping(generated);

    // Now one hop instead of three.
    assert_eq!(network.find_path("dan", "eng-arpabet").unwrap().len(), 1);
    let result = network.convert("hej", "dan", "eng-arpabet").unwrap();
    assert_eq!(result.output(), "HH EH Y");
}

#[test]
fn missing_rules_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let dan = dir.path().join("dan");
    fs::create_dir_all(&dan).unwrap();
    fs::write(
        dan.join("config-g2p.yaml"),
        "mappings:\n  - in_lang: dan\n    out_lang: dan-ipa\n    rules_path: nowhere.csv\n",
    )
    .unwrap();

    let err = network::rebuild(dir.path(), &dir.path().join("generated")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn bad_rule_pattern_is_a_compile_error() {
    let dir = TempDir::new().unwrap();
    let dan = dir.path().join("dan");
    fs::create_dir_all(&dan).unwrap();
    fs::write(dan.join("rules.csv"), "[oops,x\n").unwrap();
    fs::write(
        dan.join("config-g2p.yaml"),
        "mappings:\n  - in_lang: dan\n    out_lang: dan-ipa\n    rules_path: rules.csv\n",
    )
    .unwrap();

    let err = network::rebuild(dir.path(), &dir.path().join("generated")).unwrap_err();
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn as_is_config_is_rejected_with_migration_hint() {
    let dir = TempDir::new().unwrap();
    let dan = dir.path().join("dan");
    fs::create_dir_all(&dan).unwrap();
    fs::write(dan.join("rules.csv"), "a,b\n").unwrap();
    fs::write(
        dan.join("config-g2p.yaml"),
        concat!(
            "mappings:\n",
            "  - in_lang: dan\n",
            "    out_lang: dan-ipa\n",
            "    rules_path: rules.csv\n",
            "    as_is: true\n",
        ),
    )
    .unwrap();

    let err = network::rebuild(dir.path(), &dir.path().join("generated")).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("as_is"));
    assert!(message.contains("rule_ordering"));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn abbreviations_expand_from_files() {
    let dir = TempDir::new().unwrap();
    let lang = dir.path().join("abb");
    fs::create_dir_all(&lang).unwrap();
    fs::write(lang.join("abbs.csv"), "VOWEL,a,e,i,o,u\n").unwrap();
    fs::write(lang.join("rules.csv"), "t,d,{VOWEL},{VOWEL}\n").unwrap();
    fs::write(
        lang.join("config-g2p.yaml"),
        concat!(
            "mappings:\n",
            "  - in_lang: abb\n",
            "    out_lang: abb-ipa\n",
            "    rules_path: rules.csv\n",
            "    abbreviations_path: abbs.csv\n",
        ),
    )
    .unwrap();

    let network = network::rebuild(dir.path(), &dir.path().join("generated")).unwrap();
    let result = network.convert("atabta", "abb", "abb-ipa").unwrap();
    // t converts between vowels only.
    assert_eq!(result.output(), "adabta");
}
