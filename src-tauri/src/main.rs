#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    cheapdeck_desktop_lib::run();
}
