//# The client side model of browsing and managing the car catalog
pub mod admin;
pub mod catalog_page;
pub mod debounce;
pub mod fetch_controller;
pub mod filter_form;
pub mod filter_store;
pub mod quick_search;
pub mod result_renderer;
