const COMMANDS: &[&str] = &[
  "initialize",
  "query_products",
  "buy_product",
  "restore_purchases",
  "get_past_purchases",
  "finish_transaction",
  "set_product_ids",
  "get_product_ids",
];

fn main() {
  tauri_plugin::Builder::new(COMMANDS)
    .android_path("android")
    .ios_path("ios")
    .build();
}
