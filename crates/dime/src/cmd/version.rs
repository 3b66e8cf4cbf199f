use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("dime {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!("serialization: {}", dime_value::SERIALIZATION);
    println!("target: {}", env!("DIME_BUILD_TARGET"));
    println!("async: {}", cfg!(feature = "async"));
    Ok(SUCCESS)
}
