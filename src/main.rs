use auscout::{encode_frames, CommandError, Dispatcher, LookupConfig};

fn main() -> Result<(), CommandError> {
    tracing_subscriber::fmt::init();

    let mut dispatcher = Dispatcher::new(LookupConfig::default());

    // Seed one track: 5000 ascending hash frames.
    let frames: Vec<u32> = (1..=5000).map(|i| i * 100).collect();
    let reply = dispatcher.add_track("demo", &encode_frames(&frames), "demo track", None)?;
    println!("added track, id = {reply}");

    // Probe with a 500-frame excerpt starting 22 frames in, no toggled bits.
    let probe = encode_frames(&frames[22..522]);
    let toggles = encode_frames(&vec![0u32; 500]);
    let reply = dispatcher.lookup("demo", &probe, &toggles, Some(0.80))?;
    println!("lookup reply: {reply}");

    println!(
        "size = {}, count = {}",
        dispatcher.size("demo")?,
        dispatcher.count("demo")?
    );

    Ok(())
}
