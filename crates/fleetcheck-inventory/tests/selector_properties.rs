use std::collections::HashSet;
use std::io::Write;

use fleetcheck_inventory::{ALL_GROUP, InventoryModel};
use tempfile::NamedTempFile;

const SCENARIO: &str = "[web]\na.example.com\nb.example.com\n[web:vars]\nrole=frontend\n";

const FLEET: &str = r"
# loose hosts first
jump.example.com ansible_user=ops

[web]
web1.example.com
web2.example.com
web3.staging.example.com

[db]
db1.example.com ansible_port=2222
db2.staging.example.com

[cache]
redis1.example.com
web1.example.com

[staging:children]
web
db

[prod:children]
cache

[all:vars]
ansible_user=deploy
";

fn write_inventory(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn fixtures() -> Vec<InventoryModel> {
    [SCENARIO, FLEET, "[all]\nx\n[g]\ny\nx\n", "solo\n", ""]
        .iter()
        .map(|text| InventoryModel::parse(text))
        .collect()
}

const SELECTORS: &[&str] = &[
    "all",
    "",
    "web",
    "web,!a.example.com",
    "!web",
    "*.example.com",
    "web*:db?",
    "db,web,db",
    "cache:!web1.example.com",
    "bogus",
    "web,bogus",
    "staging:!*staging*",
    "prod,jump.example.com",
];

#[test]
fn test_scenario_from_file() {
    let file = write_inventory(SCENARIO);
    let model = InventoryModel::load(file.path()).unwrap();
    assert_eq!(model.source(), Some(file.path()));

    let web = model.resolve("web");
    assert_eq!(web.hosts, vec!["a.example.com", "b.example.com"]);
    assert!(web.validated());

    let excluded = model.resolve("web,!a.example.com");
    assert_eq!(excluded.hosts, vec!["b.example.com"]);

    let bogus = model.resolve("bogus-group");
    let error = bogus.error.unwrap();
    assert!(error.contains("No hosts matched"));
    assert!(error.contains("web"));

    assert_eq!(
        model.variables_for("a.example.com").get("role").map(String::as_str),
        Some("frontend")
    );
}

#[test]
fn test_all_is_superset_and_hosts_unique() {
    for model in fixtures() {
        let all: HashSet<&String> = model.group(ALL_GROUP).unwrap().iter().collect();
        for (name, members) in model.groups() {
            for host in members {
                assert!(all.contains(host), "{host} of {name} missing from all");
            }
        }
        let unique: HashSet<&String> = model.hosts().iter().collect();
        assert_eq!(unique.len(), model.hosts().len());
    }
}

#[test]
fn test_resolve_all_equals_hosts() {
    for model in fixtures() {
        let resolved = model.resolve("all");
        assert_eq!(resolved.hosts, model.hosts());
    }
}

#[test]
fn test_resolved_hosts_unique_subset() {
    for model in fixtures() {
        let known: HashSet<&String> = model.hosts().iter().collect();
        for selector in SELECTORS {
            let resolved = model.resolve(selector);
            let unique: HashSet<&String> = resolved.hosts.iter().collect();
            assert_eq!(unique.len(), resolved.hosts.len(), "duplicates for {selector}");
            assert!(unique.is_subset(&known), "unknown host for {selector}");
            assert_eq!(resolved.validated(), !resolved.hosts.is_empty());
        }
    }
}

#[test]
fn test_exclusion_complements_group() {
    for model in fixtures() {
        let everything: HashSet<String> = model.resolve("all").hosts.into_iter().collect();
        for group in model.group_names() {
            let mut rebuilt: HashSet<String> =
                model.resolve(&format!("all,!{group}")).hosts.into_iter().collect();
            rebuilt.extend(model.resolve(group).hosts);
            assert_eq!(rebuilt, everything, "group {group}");
        }
    }
}

#[test]
fn test_fleet_children_and_order() {
    let model = InventoryModel::parse(FLEET);

    assert_eq!(
        model.group("staging").unwrap(),
        &[
            "web1.example.com",
            "web2.example.com",
            "web3.staging.example.com",
            "db1.example.com",
            "db2.staging.example.com"
        ]
    );
    assert_eq!(
        model.resolve("staging:!*staging*").hosts,
        vec!["web1.example.com", "web2.example.com", "db1.example.com"]
    );
    assert_eq!(
        model.resolve("prod,jump.example.com").hosts,
        vec!["redis1.example.com", "web1.example.com", "jump.example.com"]
    );

    let db1 = model.variables_for("db1.example.com");
    assert_eq!(db1.get("ansible_user").map(String::as_str), Some("deploy"));
    assert_eq!(db1.get("ansible_port").map(String::as_str), Some("2222"));
    let jump = model.variables_for("jump.example.com");
    assert_eq!(jump.get("ansible_user").map(String::as_str), Some("ops"));
}

#[test]
fn test_missing_inventory_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = InventoryModel::load(&dir.path().join("hosts")).unwrap_err();
    assert!(err.is_not_found());
}
