use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use probe_hash::FnKeyBehavior;
use probe_hash::FnValueBehavior;
use probe_hash::HashTable;

#[derive(Parser, Debug)]
struct Args {
    /// Number of generated records to insert after the walk-through.
    #[arg(short = 'f', long = "fill", default_value_t = 0)]
    fill: usize,
}

#[derive(Debug, Clone)]
struct UserKey {
    id: i32,
    name: String,
}

#[derive(Debug, Clone)]
struct UserValue {
    value: f64,
    metadata: String,
}

fn hash_user_key(key: &UserKey) -> u64 {
    let mut hash: u64 = 5381;
    hash = ((hash << 5).wrapping_add(hash)) ^ key.id as u64;
    for byte in key.name.bytes() {
        hash = ((hash << 5).wrapping_add(hash)) ^ byte as u64;
    }
    hash
}

fn equal_user_key(a: &UserKey, b: &UserKey) -> bool {
    a.id == b.id && a.name == b.name
}

fn key(id: i32, name: &str) -> UserKey {
    UserKey {
        id,
        name: name.to_string(),
    }
}

fn value(value: f64, metadata: &str) -> UserValue {
    UserValue {
        value,
        metadata: metadata.to_string(),
    }
}

fn main() {
    let args = Args::parse();

    let _ = Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    println!("--- Generic Hash Table Demo ---\n");

    let key_behavior = FnKeyBehavior::new(hash_user_key, equal_user_key, UserKey::clone, drop);
    let value_behavior = FnValueBehavior::new(UserValue::clone, drop);

    let mut table = match HashTable::new(key_behavior, value_behavior) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("Failed to create hash table: {err}");
            std::process::exit(1);
        }
    };

    println!("Table created. Initial count: {}", table.count());
    println!("\nInserting data...");

    let records = [
        (key(101, "alpha"), value(3.25, "First item")),
        (key(202, "beta"), value(2.75, "Second item")),
        (key(303, "gamma"), value(1.61, "Third item")),
    ];
    for (k, v) in &records {
        if let Err(err) = table.insert(k, v) {
            eprintln!("Failed to insert {k:?}: {err}");
        }
    }
    println!("After insertions, count: {}", table.count());

    println!("\nLooking up data...");
    match table.lookup(&key(202, "beta")) {
        Some(found) => println!(
            "Found key {{202, 'beta'}}. Value: {{{:.2}, '{}'}}",
            found.value, found.metadata
        ),
        None => println!("Key {{202, 'beta'}} not found."),
    }
    if table.lookup(&key(999, "omega")).is_none() {
        println!("Correctly did not find key {{999, 'omega'}}.");
    }

    println!("\nUpdating data...");
    let updated_key = key(101, "alpha");
    if let Err(err) = table.insert(&updated_key, &value(9.81, "UPDATED first item")) {
        eprintln!("Failed to update {updated_key:?}: {err}");
    }
    if let Some(updated) = table.lookup(&updated_key) {
        println!(
            "Looked up key {{101, 'alpha'}} again. New value: {{{:.2}, '{}'}}",
            updated.value, updated.metadata
        );
    }
    println!(
        "Count after update (should be unchanged): {}",
        table.count()
    );

    println!("\nDeleting data...");
    let deleted_key = key(303, "gamma");
    if table.delete(&deleted_key) {
        println!("Successfully deleted key {{303, 'gamma'}}.");
    } else {
        println!("Failed to delete key {{303, 'gamma'}}.");
    }
    if table.lookup(&deleted_key).is_none() {
        println!("Correctly did not find deleted key.");
    }
    println!("Count after deletion: {}", table.count());

    if args.fill > 0 {
        println!("\nFilling table with {} generated records...", args.fill);
        for i in 0..args.fill {
            let id = 1_000 + i as i32;
            let k = key(id, &format!("user-{id}"));
            let v = value(i as f64, "generated");
            if let Err(err) = table.insert(&k, &v) {
                eprintln!("Insert of {k:?} failed: {err}");
                break;
            }
        }
        println!(
            "Count: {}, capacity: {} ({:.2}% load factor)",
            table.count(),
            table.capacity(),
            table.count() as f64 / table.capacity() as f64 * 100.0
        );

        #[cfg(all(feature = "stats", feature = "std"))]
        table.debug_stats().print();
    }

    println!("\nDestroying table.");
    table.destroy();
}
