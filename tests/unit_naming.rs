use swift_catalog::{pluralize, table_name_for, to_storage_name, CatalogError, TableRegistry};

#[test]
fn storage_names_are_lower_snake_case() {
    assert_eq!(to_storage_name("countryIso2"), "country_iso2");
    assert_eq!(to_storage_name("swiftCode"), "swift_code");
    assert_eq!(to_storage_name("isHeadquarter"), "is_headquarter");
    assert_eq!(to_storage_name("town_name"), "town_name");
    assert_eq!(to_storage_name("Branch"), "branch");
}

#[test]
fn pluralizes_regular_words() {
    assert_eq!(pluralize("bank"), "banks");
    assert_eq!(pluralize("branch"), "branches");
    assert_eq!(pluralize("address"), "addresses");
    assert_eq!(pluralize("country"), "countries");
    assert_eq!(pluralize("day"), "days");
}

#[test]
fn pluralizes_irregular_and_uncountable_words() {
    assert_eq!(pluralize("headquarters"), "headquarters");
    assert_eq!(pluralize("person"), "people");
    assert_eq!(pluralize("news"), "news");
}

#[test]
fn only_the_last_segment_is_inflected() {
    assert_eq!(pluralize("bank_branch"), "bank_branches");
    assert_eq!(pluralize("regional_office"), "regional_offices");
    assert_eq!(pluralize("bank_headquarters"), "bank_headquarters");
}

#[test]
fn table_names_come_from_type_names() {
    assert_eq!(table_name_for("Headquarters"), "headquarters");
    assert_eq!(table_name_for("Branch"), "branches");
    assert_eq!(table_name_for("BankBranch"), "bank_branches");
    assert_eq!(table_name_for("CorrespondentBank"), "correspondent_banks");
}

#[test]
fn registry_rejects_two_entities_on_one_table() {
    let mut registry = TableRegistry::new();
    registry.register("Headquarters", "headquarters").unwrap();
    registry.register("Branch", "branches").unwrap();
    // same entity twice is fine
    registry.register("Branch", "branches").unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.owner_of("branches"), Some("Branch"));

    let err = registry.register("BranchOffice", "branches").unwrap_err();
    assert!(matches!(err, CatalogError::Configuration(_)));
    assert!(err.to_string().contains("branches"));
    assert_eq!(registry.owner_of("branches"), Some("Branch"));
}
