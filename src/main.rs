fn main() {
    let status = small_host::run(
        "127.0.0.1:3000",
        "demos/hello/host.toml",
        "./.small-host/tmp",
        "./.small-host/logs",
    );

    println!("small-host exited with status {}", status);
    std::process::exit(status);
}
