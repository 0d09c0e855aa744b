use kdb_core::{DomainName, HostId, RunId, CONFIG_SUFFIX, QUARANTINE_DIR};

#[test]
fn test_run_id_new() {
    let a = RunId::new();
    let b = RunId::new();
    assert_ne!(a, b);
    assert_eq!(a.to_string(), a.as_str());
}

#[test]
fn test_names_sort_by_value() {
    let mut names = vec![
        DomainName::parse("web").unwrap(),
        DomainName::parse("db").unwrap(),
    ];
    names.sort();
    assert_eq!(names[0].as_str(), "db");
}

#[test]
fn test_layout_constants() {
    assert!(HostId::parse(QUARANTINE_DIR).is_err());
    assert!(DomainName::parse("vm1").unwrap().file_name().ends_with(CONFIG_SUFFIX));
}
