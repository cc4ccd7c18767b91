pub mod face_locator;
pub mod region_selector;
