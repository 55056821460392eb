/// Import ledger behaviour against real files in a temporary chrome directory.
use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use ucload_pm::installer::{InstallOptions, ModInstaller};
use ucload_pm::ledger::{ImportLedger, MASTER_STYLESHEET};

fn chrome_with(content: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(MASTER_STYLESHEET), content).unwrap();
    dir
}

#[test]
fn test_disable_then_list() {
    let chrome = chrome_with("@import url('theme/mod.css');\n@import url('mod.css');\n");
    let ledger = ImportLedger::new(chrome.path());

    ledger.toggle(0, false).unwrap();
    let imports = ledger.list_imports().unwrap();

    let disabled: Vec<_> = imports.iter().filter(|i| !i.enabled).collect();
    assert_eq!(disabled.len(), 1);
    assert_eq!(disabled[0].index, 0);
    assert_eq!(disabled[0].display_text(), "@import url('theme/mod.css');");
    assert!(imports[1].enabled);
}

#[test]
fn test_non_import_content_survives_every_operation() {
    let user_rules = "/* my tweaks */\n#nav-bar {\n  background: red;\n}\n";
    let chrome = chrome_with(user_rules);
    let ledger = ImportLedger::new(chrome.path());

    ledger.add_import("@import url('a.css');").unwrap();
    ledger.add_import("@import url('b/mod.css');").unwrap();
    ledger.toggle(1, false).unwrap();
    ledger.toggle(1, true).unwrap();
    ledger.remove_one(0).unwrap();
    ledger.remove_all().unwrap();

    assert_eq!(fs::read_to_string(ledger.master_path()).unwrap(), user_rules);
}

#[tokio::test]
async fn test_remove_all_leaves_nothing_behind() {
    let chrome = TempDir::new().unwrap();
    let sources = TempDir::new().unwrap();
    let installer = ModInstaller::new(chrome.path());
    let ledger = ImportLedger::new(chrome.path());

    for name in ["alpha", "beta"] {
        let folder = sources.path().join(name);
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("userChrome.css"), name).unwrap();
        fs::write(folder.join("extra.css"), "x").unwrap();

        let outcome = installer
            .install_local(&folder, &InstallOptions::default())
            .await
            .unwrap();
        ledger.add_import(&outcome.import_line).unwrap();
    }
    let single = sources.path().join("colors.css");
    fs::write(&single, ":root {}").unwrap();
    let outcome = installer
        .install_local(&single, &InstallOptions::default())
        .await
        .unwrap();
    ledger.add_import(&outcome.import_line).unwrap();

    let before = ledger.list_imports().unwrap();
    assert_eq!(before.len(), 3);

    let report = ledger.remove_all().unwrap();
    assert!(report.is_clean());
    assert!(ledger.list_imports().unwrap().is_empty());
    for import in before {
        let path = import.path.unwrap();
        let first = path.split('/').next().unwrap();
        assert!(!chrome.path().join(first).exists(), "{} still exists", first);
    }
}

#[test]
fn test_concurrent_adds_are_serialized() {
    let chrome = TempDir::new().unwrap();
    let ledger = Arc::new(ImportLedger::new(chrome.path()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            std::thread::spawn(move || {
                ledger.add_import(&format!("@import url('mod{}.css');", i)).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let imports = ledger.list_imports().unwrap();
    assert_eq!(imports.len(), 8);
    for i in 0..8 {
        let expected = format!("mod{}.css", i);
        assert!(imports.iter().any(|line| line.path.as_deref() == Some(expected.as_str())));
    }
}
