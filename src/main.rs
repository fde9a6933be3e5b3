#[macro_use]
extern crate rocket;

#[launch]
fn rocket() -> _ {
    catalog_import::rocket()
}
