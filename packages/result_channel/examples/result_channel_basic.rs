//! Hands work to a few threads and collects each outcome through its own result channel.

use std::thread;
use std::time::Duration;

use result_channel::{ChannelError, ResultChannel};

fn main() {
    let receivers: Vec<_> = [4_u32, 9, 0, 16]
        .into_iter()
        .map(|input| {
            let (sender, receiver) = ResultChannel::<u32, String>::create();

            thread::spawn(move || {
                thread::sleep(Duration::from_millis(u64::from(input)));

                let outcome = if input == 0 {
                    Err("zero is not accepted".to_string())
                } else {
                    Ok(input.isqrt())
                };

                _ = sender.resolve_with(outcome);
            });

            (input, receiver)
        })
        .collect();

    for (input, receiver) in receivers {
        match receiver.wait() {
            Ok(root) => println!("sqrt({input}) = {root}"),
            Err(ChannelError::Failed(reason)) => println!("sqrt({input}) failed: {reason}"),
            Err(other) => println!("sqrt({input}) produced no outcome: {other}"),
        }
    }
}
