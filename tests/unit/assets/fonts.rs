use std::cell::RefCell;

use super::*;

#[derive(Default)]
struct FakeProvider {
    calls: RefCell<Vec<String>>,
    fallback: Option<Arc<Vec<u8>>>,
}

impl FontProvider for FakeProvider {
    async fn load_family(&self, family: &str) -> ThumbResult<Vec<u8>> {
        self.calls.borrow_mut().push(family.to_owned());
        if family == "Broken" {
            return Err(ThumbError::io("font server unreachable"));
        }
        Ok(family.as_bytes().to_vec())
    }

    fn fallback(&self) -> Option<Arc<Vec<u8>>> {
        self.fallback.clone()
    }
}

#[test]
fn request_id_replaces_whitespace_runs() {
    assert_eq!(font_request_id("Inter"), "font-Inter");
    assert_eq!(font_request_id("Open  Sans"), "font-Open-Sans");
    assert_eq!(font_request_id("Bebas Neue Pro"), "font-Bebas-Neue-Pro");
}

#[test]
fn ready_twice_issues_one_load_per_family() {
    let mut gate = FontGate::new(FakeProvider::default());
    gate.request(["Inter", "Roboto", "Inter"]);
    assert!(!gate.is_ready());
    pollster::block_on(gate.ready());
    gate.request(["Roboto", "Inter"]);
    pollster::block_on(gate.ready());

    assert!(gate.is_ready());
    assert_eq!(gate.request_count(), 2);
    let mut calls = gate.provider().calls.borrow().clone();
    calls.sort();
    assert_eq!(calls, vec!["Inter".to_owned(), "Roboto".to_owned()]);
}

#[test]
fn failed_family_is_not_retried_and_uses_fallback() {
    let provider = FakeProvider {
        fallback: Some(Arc::new(b"fallback".to_vec())),
        ..Default::default()
    };
    let mut gate = FontGate::new(provider);
    gate.request(["Broken"]);
    pollster::block_on(gate.ready());
    gate.request(["Broken"]);
    pollster::block_on(gate.ready());

    assert_eq!(gate.request_count(), 1);
    assert!(matches!(gate.status("Broken"), Some(FontStatus::Fallback)));
    let resolved = gate.font_for("Broken").unwrap();
    assert_eq!(resolved.key, "fallback");
    assert_eq!(resolved.bytes.as_slice(), b"fallback");
}

#[test]
fn loaded_family_resolves_to_own_bytes_and_unknown_without_fallback_is_none() {
    let mut gate = FontGate::new(FakeProvider::default());
    gate.request(["Inter"]);
    pollster::block_on(gate.ready());

    let inter = gate.font_for("Inter").unwrap();
    assert_eq!(inter.key, "font-Inter");
    assert_eq!(inter.bytes.as_slice(), b"Inter");
    assert!(gate.font_for("Never Requested").is_none());
}

#[test]
fn dir_provider_matches_normalized_stems() {
    let dir = std::path::PathBuf::from("target").join("font_provider_test");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("OpenSans-Bold.ttf"), b"bold").unwrap();
    std::fs::write(dir.join("OpenSans-Regular.ttf"), b"regular").unwrap();
    std::fs::write(dir.join("notes.txt"), b"not a font").unwrap();

    let cfg = FontConfig {
        dir: Some(dir.clone()),
        ..Default::default()
    };
    let provider = DirFontProvider::from_config(&cfg).unwrap();
    let bytes = pollster::block_on(provider.load_family("Open Sans")).unwrap();
    assert_eq!(bytes, b"regular");
    assert!(pollster::block_on(provider.load_family("Comic Neue")).is_err());
    assert!(provider.fallback().is_none());
}
