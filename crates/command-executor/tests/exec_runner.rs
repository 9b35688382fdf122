//! Tests for local command execution

use command_executor::{CommandRunner, CopyableFile, Error, ExecRunner};

#[test]
fn test_combined_output_captures_both_streams() {
    smol::block_on(async {
        let output = ExecRunner
            .combined_output("echo out; echo err 1>&2")
            .await
            .unwrap();

        let mut lines: Vec<&str> = output.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    });
}

#[test]
fn test_non_zero_exit_keeps_output() {
    smol::block_on(async {
        let err = ExecRunner
            .combined_output("echo inactive; exit 3")
            .await
            .unwrap_err();

        match err {
            Error::NonZeroExit { code, output, command } => {
                assert_eq!(code, Some(3));
                assert_eq!(output, "inactive\n");
                assert_eq!(command, "echo inactive; exit 3");
            }
            other => panic!("unexpected error: {other}"),
        }
    });
}

#[test]
fn test_multiline_command() {
    smol::block_on(async {
        let result = ExecRunner
            .run(
                "
true &&
true &&
true
",
            )
            .await;
        assert!(result.is_ok());
    });
}

#[test]
fn test_streaming_to_sink() {
    smol::block_on(async {
        let mut sink = futures::io::Cursor::new(Vec::new());
        ExecRunner
            .combined_output_to("printf 'one\\ntwo\\n'", &mut sink)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "one\ntwo\n");
    });
}

#[test]
fn test_non_utf8_output_is_not_an_error() {
    smol::block_on(async {
        let output = ExecRunner
            .combined_output("printf 'kubelet \\377 started\\n'")
            .await
            .unwrap();
        assert_eq!(output, "kubelet \u{FFFD} started\n");

        let mut sink = futures::io::Cursor::new(Vec::new());
        ExecRunner
            .combined_output_to("printf 'a \\377 b\\n'", &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.into_inner(), b"a \xff b\n");
    });
}

#[test]
fn test_copy_creates_directories_and_mode() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("etc/cni/net.d/k8s.conf");
        let file = CopyableFile::from_memory("{}", target.to_str().unwrap(), "0644");

        ExecRunner.copy(&file).await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644);
        }
    });
}

#[test]
fn test_copy_from_local_file() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("kubelet");
        std::fs::write(&source, b"binary").unwrap();
        let dest_dir = dir.path().join("usr/bin");
        let file = CopyableFile::from_file(&source, dest_dir.to_str().unwrap(), "kubelet", "0755");

        ExecRunner.copy(&file).await.unwrap();

        assert_eq!(std::fs::read(dest_dir.join("kubelet")).unwrap(), b"binary");
    });
}
