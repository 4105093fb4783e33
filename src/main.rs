#[macro_use]
extern crate rocket;

#[launch]
fn rocket() -> _ {
    crm_api_server::rocket()
}
