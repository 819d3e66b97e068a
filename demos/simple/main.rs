use animflow::{ChannelEvent, ChannelOptions, Config, GenerationEvent, GenerationState, GraphModel, SessionBuilder};

fn main() {
    let config = Config::load_from_str(
        r#"
        async_worker_thread_number = 4

        [backend]
        api_base = "https://generativelanguage.googleapis.com/v1beta"
        api_key = ""
        timeout_ms = 60000

        [models]
        gateway = false
    "#,
    );

    let session = SessionBuilder::new().config(config).build().unwrap();
    session.launch();

    let text = include_str!("./chain.json");
    let model = GraphModel::from_json(text).unwrap();
    session.load_graph(&model).unwrap();

    println!("{}", session.graph().schema());

    ChannelEvent::channel(session.channel(), ChannelOptions::default()).on_succeeded(|e| {
        if let GenerationEvent::Succeeded(done) = &e.event {
            println!("Generation succeeded on {} with model {}", e.nid, done.model_used);
        }
    });

    ChannelEvent::channel(session.channel(), ChannelOptions::default()).on_failed(|e| {
        if let GenerationEvent::Failed(failed) = &e.event {
            println!("Generation failed on {}: {} (quota: {}, retry in: {:?}s)", e.nid, failed.message, failed.quota_exceeded, failed.retry_after_seconds);
        }
    });

    let output_id = match session.trigger_from_instruction(None) {
        Ok(id) => id,
        Err(err) => {
            println!("Cannot trigger generation: {}", err);
            return;
        }
    };

    loop {
        match session.graph().generation_state(&output_id) {
            Some(GenerationState::Succeeded) | Some(GenerationState::Failed) => break,
            _ => std::thread::sleep(std::time::Duration::from_millis(100)),
        }
    }

    if let Some(node) = session.graph().get_node(&output_id) {
        if let Some(output) = node.output() {
            if let Some(content) = &output.output_content {
                println!("Output:\n{}", content);
            }
        }
    }

    session.shutdown();
}
