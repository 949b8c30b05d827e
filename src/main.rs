fn main() {
    std::process::exit(beevent_dashboard_lib::run());
}
