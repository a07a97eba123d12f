pub mod check;

use upgradeguard_engine::runner::analyzer_inventory;

pub fn list_analyzers() -> i32 {
    for (name, description) in analyzer_inventory() {
        println!("{name:<28} {description}");
    }
    0
}
