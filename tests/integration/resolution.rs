use linkgraph::client::Client;
use linkgraph::config::ClientConfig;
use linkgraph::core::Object;
use linkgraph::network::{CallResult, Pagination};
use linkgraph::selection::Selection;
use linkgraph::test_utils::{MockNetwork, fixtures};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;

fn object(value: Value) -> Object {
    value.as_object().cloned().unwrap()
}

fn client(network: &MockNetwork) -> Client {
    Client::with_collaborators(ClientConfig::default(), Arc::new(fixtures::provider()), Arc::new(network.clone()))
}

fn phone_page(page: u64, phones: Vec<Value>) -> CallResult {
    CallResult {
        pagination: Some(Pagination {
            total_pages: 2,
            total_count: 3,
            current_page: page,
        }),
        ..CallResult::from_objects(phones.into_iter().map(object).collect())
    }
}

fn numbers(user: &Value) -> Vec<Value> {
    user["phones"].as_array().unwrap().iter().map(|phone| phone["number"].clone()).collect()
}

#[tokio::test]
async fn test_schema_owners_with_nested_linked_associations() {
    let network = MockNetwork::new()
        .respond(
            fixtures::USER_CONTEXT_URL,
            "get",
            vec![Value::Object(fixtures::user(3, Some(9), &[])), Value::Object(fixtures::user(4, None, &[]))],
        )
        .respond(fixtures::ORGANIZATION_CONTEXT_URL, "get", vec![fixtures::organization(9, "Acme")])
        .respond_page(
            fixtures::PHONE_CONTEXT_URL,
            "query",
            1,
            phone_page(1, vec![fixtures::phone(1, 3, "555-0001"), fixtures::phone(2, 4, "555-0002")]),
        )
        .respond_page(fixtures::PHONE_CONTEXT_URL, "query", 2, phone_page(2, vec![fixtures::phone(3, 3, "555-0003")]));
    let bicycles = vec![fixtures::bicycle(1, 3, 5, &[11]), fixtures::bicycle(2, 4, 5, &[12])];
    let selection = Selection::parse("name, owner { first_name, organization { name }, phones { number } }").unwrap();

    let resolved = client(&network).resolve(bicycles, &selection).await.unwrap();

    let first_owner = &resolved[0]["owner"];
    let second_owner = &resolved[1]["owner"];
    assert_eq!(first_owner["first_name"], json!("User 3"));
    assert_eq!(first_owner["organization"]["name"], json!("Acme"));
    assert_eq!(second_owner["organization"], Value::Null);
    assert_eq!(numbers(first_owner), vec![json!("555-0001"), json!("555-0003")]);
    assert_eq!(numbers(second_owner), vec![json!("555-0002")]);
    assert!(resolved[0].get("manufacturer").is_none());
    assert_eq!(resolved[0]["name"], json!("Bicycle 1"));

    // every remaining page of the to-many association was fetched
    assert_eq!(network.call_count(fixtures::PHONE_CONTEXT_URL, "query"), 2);
    assert_eq!(network.call_count(fixtures::USER_CONTEXT_URL, "get"), 1);
    assert_eq!(network.call_count(fixtures::ORGANIZATION_CONTEXT_URL, "get"), 1);
}

#[tokio::test]
async fn test_fetch_then_assign_in_two_steps() {
    let network = MockNetwork::new().respond(
        fixtures::WHEEL_SCHEMA_URL,
        "get",
        vec![fixtures::wheel(11, 28), fixtures::wheel(12, 28), fixtures::wheel(13, 26)],
    );
    let client = client(&network);
    let mut bicycles = vec![fixtures::bicycle(1, 3, 5, &[11, 12]), fixtures::bicycle(2, 4, 6, &[13])];

    let fetched = client.fetch(&bicycles, "wheels").await.unwrap();
    assert!(fetched.many);
    assert_eq!(fetched.extracted.all["id"], vec!["11", "12", "13"]);
    assert_eq!(network.calls()[0].options.params["wheel_ids"], json!(["11", "12", "13"]));

    client.assign(&mut bicycles, &fetched);

    assert_eq!(bicycles[0]["wheels"], json!([fixtures::wheel(11, 28), fixtures::wheel(12, 28)]));
    assert_eq!(bicycles[1]["wheels"], json!([fixtures::wheel(13, 26)]));
}

#[tokio::test]
async fn test_association_without_nested_selection_is_taken_whole() {
    let network = MockNetwork::new().respond(
        fixtures::USER_CONTEXT_URL,
        "get",
        vec![Value::Object(fixtures::user(3, Some(9), &["gs1"]))],
    );
    let bicycles = vec![fixtures::bicycle(1, 3, 5, &[11])];

    let resolved = client(&network).resolve(bicycles, &Selection::parse("owner").unwrap()).await.unwrap();

    assert_eq!(resolved[0]["owner"], Value::Object(fixtures::user(3, Some(9), &["gs1"])));
    assert_eq!(network.calls().len(), 1);
}
