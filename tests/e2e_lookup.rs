//! End-to-end encrypted lookup over BFV
//!
//! Setup → Query → Respond → Extract = value of the matching row

use fhe_lookup::lookup::{respond, respond_sequential, setup};
use fhe_lookup::metrics::Timings;
use fhe_lookup::params::LookupParams;
use fhe_lookup::table::{parse_table, EncryptedTable, TableRow};
use fhe_lookup::SlotCodec;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn countries() -> Vec<TableRow> {
    vec![
        TableRow::new("France", "Paris"),
        TableRow::new("Spain", "Madrid"),
        TableRow::new("Portugal", "Lisbon"),
    ]
}

#[test]
fn test_e2e_finds_capital() {
    let params = LookupParams::test_small();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let (client, table) = setup(&params, &countries(), &mut rng, &mut Timings::new()).unwrap();
    let evaluator = client.evaluator();

    let query = client.query("Spain").unwrap();
    let response = respond(&evaluator, &table.entries, &query).unwrap();
    assert_eq!(client.extract(&response).unwrap().as_deref(), Some("Madrid"));

    let query = client.query("France").unwrap();
    let response = respond_sequential(&evaluator, &table.entries, &query).unwrap();
    assert_eq!(client.extract(&response).unwrap().as_deref(), Some("Paris"));
}

#[test]
fn test_e2e_not_found() {
    let params = LookupParams::test_small();
    let mut rng = ChaCha8Rng::seed_from_u64(43);
    let (client, table) = setup(&params, &countries(), &mut rng, &mut Timings::new()).unwrap();

    let query = client.query("Italy").unwrap();
    let response = respond(&client.evaluator(), &table.entries, &query).unwrap();
    assert_eq!(client.extract(&response).unwrap(), None);

    // a prefix of a stored key is a different key
    let query = client.query("Spai").unwrap();
    let response = respond(&client.evaluator(), &table.entries, &query).unwrap();
    assert_eq!(client.extract(&response).unwrap(), None);
}

#[test]
fn test_e2e_order_independent() {
    let params = LookupParams::test_small();
    let mut rng = ChaCha8Rng::seed_from_u64(44);
    let (client, table) = setup(&params, &countries(), &mut rng, &mut Timings::new()).unwrap();

    let mut reversed = table.entries.clone();
    reversed.reverse();

    let query = client.query("Portugal").unwrap();
    let evaluator = client.evaluator();
    let a = respond(&evaluator, &table.entries, &query).unwrap();
    let b = respond(&evaluator, &reversed, &query).unwrap();
    assert_eq!(client.extract(&a).unwrap(), client.extract(&b).unwrap());
    assert_eq!(client.extract(&b).unwrap().as_deref(), Some("Lisbon"));
}

#[test]
fn test_e2e_empty_table() {
    let params = LookupParams::test_small();
    let mut rng = ChaCha8Rng::seed_from_u64(45);
    let (client, table) = setup(&params, &[], &mut rng, &mut Timings::new()).unwrap();
    assert!(table.is_empty());

    let query = client.query("Spain").unwrap();
    let response = respond(&client.evaluator(), &table.entries, &query).unwrap();
    assert_eq!(client.extract(&response).unwrap(), None);
}

#[test]
fn test_e2e_table_file() {
    let params = LookupParams::test_small();
    let codec = SlotCodec::for_params(&params);
    let rows = parse_table("# country,capital\nMalta,Valletta\nCyprus,Nicosia\n", &codec).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(46);
    let (client, table) = setup(&params, &rows, &mut rng, &mut Timings::new()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.fhet");
    table.save(&path).unwrap();
    let loaded = EncryptedTable::load(&path, client.context()).unwrap();
    assert_eq!(loaded.len(), 2);

    let query = client.query("Cyprus").unwrap();
    let response = respond(&client.evaluator(), &loaded.entries, &query).unwrap();
    assert_eq!(client.extract(&response).unwrap().as_deref(), Some("Nicosia"));
}
