use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    let mut config = prost_build::Config::new();
    // 未设置 PROTOC 时使用 vendored 版本
    if env::var_os("PROTOC").is_none() {
        config.protoc_executable(protoc_bin_vendored::protoc_bin_path()?);
    }

    let proto_files = [PathBuf::from("../../proto/notifications/v1/notifications.proto")];
    let includes = [
        PathBuf::from("../../proto"),
        protoc_bin_vendored::include_path()?,
    ];

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("notifications_descriptor.bin"))
        .compile_protos_with_config(config, &proto_files, &includes)?;

    println!("cargo:rerun-if-changed=../../proto/notifications/v1/notifications.proto");
    Ok(())
}
