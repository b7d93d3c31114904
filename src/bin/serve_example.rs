use xml2rfc_compat::{
    Adapter, CompatConfig, IncludeMode, MemorySource,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let source = MemorySource::new();
    source.publish(
        "ref",
        "rfc2119",
        "<reference anchor=\"RFC2119\"><front>\
         <title>Key words for use in RFCs to Indicate Requirement Levels</title>\
         <author fullname=\"S. Bradner\"/><date year=\"1997\"/></front></reference>",
    );
    let adapter = Adapter::new(CompatConfig::default(), source);

    // legacy-shaped fragment request
    let fragment = adapter.serve_fragment("bibxml/reference.RFC.2119.xml")?;
    println!(
        "fetched {} bytes, hash {}",
        fragment.content.len(),
        fragment.meta.hash
    );

    // legacy XML submission in, canonical XML out
    let submission = "<rfc xmlns:xi=\"http://www.w3.org/2001/XInclude\" version=\"3\" \
        category=\"info\" docName=\"draft-example-00\" submissionType=\"IETF\">\
        <front><title>Example</title><author fullname=\"Jane Roe\"/>\
        <date year=\"2024\"/></front><middle><t>Hello.</t></middle>\
        <back><references><name>Normative References</name>\
        <xi:include href=\"normative-reference-set/RFC2119\"/></references></back></rfc>";
    let doc = adapter.ingest_submission(submission)?;
    println!("ingested {} rev {}", doc.name, doc.rev);

    let xml = adapter.render_document(&doc, IncludeMode::Inline)?;
    println!("{xml}");

    for meta in adapter.directory_overview()? {
        println!(
            "{}: {} fragments, aliases {:?}",
            meta.name, meta.total_count, meta.aliases
        );
    }

    Ok(())
}
